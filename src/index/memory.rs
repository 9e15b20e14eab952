use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{IndexDocument, IndexService, NewVersion, Version};
use crate::error::{IndexError, IndexResult};

/// In-process index with the same revision and family semantics as the
/// remote service. Serves local runs without an index URL, and tests.
#[derive(Default)]
pub struct MemoryIndex {
    records: Mutex<BTreeMap<String, IndexDocument>>,
}

impl MemoryIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, IndexDocument>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stores a document as-is, replacing any record with the same id.
    pub fn insert(&self, doc: IndexDocument) {
        self.records().insert(doc.did.clone(), doc);
    }

    /// Snapshot of every stored record.
    #[must_use]
    pub fn documents(&self) -> Vec<IndexDocument> {
        self.records().values().cloned().collect()
    }

    fn new_record(did: String, baseid: String, attrs: &NewVersion) -> IndexDocument {
        IndexDocument {
            did,
            baseid: Some(baseid),
            rev: Some(new_rev()),
            version: Version::Head,
            hashes: attrs.hashes.clone(),
            size: attrs.size,
            file_name: attrs.file_name.clone(),
            urls: attrs.urls.clone().unwrap_or_default(),
            metadata: attrs.metadata.clone().unwrap_or_default(),
            form: Some("object".to_string()),
        }
    }
}

fn new_rev() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[async_trait]
impl IndexService for MemoryIndex {
    async fn get(&self, did: &str) -> IndexResult<Option<IndexDocument>> {
        Ok(self.records().get(did).cloned())
    }

    async fn list_versions(&self, did: &str) -> IndexResult<Vec<IndexDocument>> {
        let records = self.records();
        let Some(baseid) = records.get(did).and_then(|d| d.baseid.clone()) else {
            return Ok(Vec::new());
        };
        Ok(records
            .values()
            .filter(|d| d.baseid.as_deref() == Some(baseid.as_str()))
            .cloned()
            .collect())
    }

    async fn create(&self, did: &str, attrs: &NewVersion) -> IndexResult<IndexDocument> {
        let mut records = self.records();
        if records.contains_key(did) {
            return Err(IndexError::Conflict {
                did: did.to_string(),
            });
        }

        let doc = Self::new_record(did.to_string(), Uuid::new_v4().to_string(), attrs);
        records.insert(doc.did.clone(), doc.clone());
        Ok(doc)
    }

    async fn add_version(&self, did: &str, attrs: &NewVersion) -> IndexResult<IndexDocument> {
        let mut records = self.records();
        let baseid = records
            .get(did)
            .and_then(|d| d.baseid.clone())
            .ok_or_else(|| IndexError::NotFound {
                did: did.to_string(),
            })?;

        let doc = Self::new_record(Uuid::new_v4().to_string(), baseid, attrs);
        records.insert(doc.did.clone(), doc.clone());
        Ok(doc)
    }

    async fn patch(&self, doc: &IndexDocument) -> IndexResult<IndexDocument> {
        let mut records = self.records();
        let stored = records.get_mut(&doc.did).ok_or_else(|| IndexError::NotFound {
            did: doc.did.clone(),
        })?;

        if stored.rev != doc.rev {
            return Err(IndexError::Conflict {
                did: doc.did.clone(),
            });
        }

        let mut updated = doc.clone();
        updated.baseid = stored.baseid.clone();
        updated.rev = Some(new_rev());
        *stored = updated.clone();
        Ok(updated)
    }
}
