//! In-memory results cache for testing and single-process deployments.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{ExtractionError, Result};
use crate::traits::store::{JobEntry, JobStatus, ResultStore};
use crate::types::record::DocumentOutcome;

/// In-memory results cache.
///
/// Suitable for a single process; data is lost on restart.
pub struct MemoryResultStore {
    entries: RwLock<HashMap<String, JobEntry>>,
}

impl Default for MemoryResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryResultStore {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries, in any state.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// True when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    fn finish(
        &self,
        document_id: &str,
        apply: impl FnOnce(&mut JobEntry),
    ) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        let entry = entries
            .get_mut(document_id)
            .ok_or_else(|| ExtractionError::Cache {
                id: document_id.to_string(),
                reason: "not claimed".to_string(),
            })?;

        if entry.is_terminal() {
            return Err(ExtractionError::Cache {
                id: document_id.to_string(),
                reason: format!("already terminal ({:?})", entry.status),
            });
        }

        apply(entry);
        entry.finished_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn begin(&self, document_id: &str) -> Result<bool> {
        let mut entries = self.entries.write().unwrap();
        if entries.contains_key(document_id) {
            return Ok(false);
        }
        entries.insert(document_id.to_string(), JobEntry::processing(document_id));
        Ok(true)
    }

    async fn complete(&self, document_id: &str, outcome: DocumentOutcome) -> Result<()> {
        self.finish(document_id, |entry| {
            entry.status = JobStatus::Completed;
            entry.outcome = Some(outcome);
        })
    }

    async fn fail(&self, document_id: &str, message: &str) -> Result<()> {
        self.finish(document_id, |entry| {
            entry.status = JobStatus::Error;
            entry.error = Some(message.to_string());
        })
    }

    async fn get(&self, document_id: &str) -> Result<Option<JobEntry>> {
        Ok(self.entries.read().unwrap().get(document_id).cloned())
    }

    async fn statuses(&self) -> Result<Vec<(String, JobStatus)>> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .values()
            .map(|e| (e.document_id.clone(), e.status))
            .collect())
    }
}
