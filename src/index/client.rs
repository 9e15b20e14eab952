use async_trait::async_trait;

use super::{IndexDocument, NewVersion};
use crate::error::IndexResult;

/// Operations consumed from the index service.
#[async_trait]
pub trait IndexService: Send + Sync {
    /// Fetches one record; `None` when the index has no such id.
    async fn get(&self, did: &str) -> IndexResult<Option<IndexDocument>>;

    /// Every record sharing the entity's base id, in no particular order.
    /// Empty when the entity is unknown.
    async fn list_versions(&self, did: &str) -> IndexResult<Vec<IndexDocument>>;

    /// Registers a brand-new entity under `did` as a head record.
    async fn create(&self, did: &str, attrs: &NewVersion) -> IndexResult<IndexDocument>;

    /// Adds a new head record to the family of `did`.
    async fn add_version(&self, did: &str, attrs: &NewVersion) -> IndexResult<IndexDocument>;

    /// Persists the mutable fields of `doc`, guarded by its revision.
    /// Returns the document carrying its new revision.
    async fn patch(&self, doc: &IndexDocument) -> IndexResult<IndexDocument>;
}
