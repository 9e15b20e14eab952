//! Versioning on top of the index service.
//!
//! Every logical entity owns at most one head (unversioned, mutable record)
//! plus any number of frozen, numbered versions. Writes land on the head;
//! a release freezes the head as the next version number.

use std::sync::Arc;

use tracing::{debug, info};

use super::{IndexDocument, IndexService, NewVersion, Version};
use crate::error::{IndexError, IndexResult};

pub struct IndexVersionHelper {
    index: Arc<dyn IndexService>,
}

/// The head of an entity and the highest version frozen so far.
#[derive(Debug, Default)]
pub struct ReleasePlan {
    pub head: Option<IndexDocument>,
    pub latest_version: u32,
}

impl ReleasePlan {
    /// Scans every record of one entity. More than one head is an error.
    pub fn from_versions(did: &str, versions: Vec<IndexDocument>) -> IndexResult<Self> {
        let mut plan = ReleasePlan::default();
        let mut heads = 0usize;

        for doc in versions {
            match doc.version {
                Version::Head => {
                    heads += 1;
                    plan.head = Some(doc);
                }
                Version::Versioned(n) => plan.latest_version = plan.latest_version.max(n),
            }
        }

        if heads > 1 {
            return Err(IndexError::MultipleHeads {
                did: did.to_string(),
                count: heads,
            });
        }

        Ok(plan)
    }

    /// Number the head receives on release. Fails when the highest stored
    /// version is already `u32::MAX`.
    pub fn next_version(&self, did: &str) -> IndexResult<u32> {
        self.latest_version.checked_add(1).ok_or_else(|| {
            IndexError::Malformed(format!(
                "entity {did} already holds the highest version number {}",
                self.latest_version
            ))
        })
    }
}

impl IndexVersionHelper {
    #[must_use]
    pub fn new(index: Arc<dyn IndexService>) -> Self {
        Self { index }
    }

    /// Makes `attrs` the current content of entity `did`.
    ///
    /// - unknown entity: a head record is created under `did`
    /// - `did` is the head: the head is updated in place
    /// - `did` is frozen: the family's head is updated, or a new head is added
    ///   when the family has none
    pub async fn add_node_version(
        &self,
        did: &str,
        attrs: &NewVersion,
    ) -> IndexResult<IndexDocument> {
        attrs.validate()?;

        let Some(current) = self.index.get(did).await? else {
            debug!(did, "Creating head record for new entity");
            return self.index.create(did, attrs).await;
        };

        let mut head = match current.version {
            Version::Head => current,
            Version::Versioned(_) => {
                let plan = ReleasePlan::from_versions(did, self.index.list_versions(did).await?)?;
                match plan.head {
                    Some(head) => head,
                    None => {
                        debug!(did, "Adding head record after frozen version");
                        return self.index.add_version(did, attrs).await;
                    }
                }
            }
        };

        debug!(did, head = %head.did, "Updating head record");
        head.apply(attrs);
        self.index.patch(&head).await
    }

    /// Freezes the head of entity `did` as the next version and stamps `release`
    /// into its metadata. Returns false when the entity has no head.
    pub async fn release_node(&self, release: &str, did: &str) -> IndexResult<bool> {
        let plan = ReleasePlan::from_versions(did, self.index.list_versions(did).await?)?;
        let Some(mut head) = plan.head.clone() else {
            debug!(did, "Nothing to release");
            return Ok(false);
        };
        let number = plan.next_version(did)?;

        head.stamp_release(number, release);
        self.index.patch(&head).await?;

        info!(did, head = %head.did, version = number, release, "Released entity");
        Ok(true)
    }
}
