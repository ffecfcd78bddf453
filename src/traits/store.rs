//! Result-store trait - the per-document results cache contract.
//!
//! Workers only ever insert into the cache: each document id is claimed
//! by exactly one worker and written exactly once, transitioning
//! `Processing -> Completed | Error`. Entries interrupted by shutdown
//! stay `Processing` and must never be read as complete.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::types::record::DocumentOutcome;

/// Lifecycle state of one cached document job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Claimed by a worker; no result yet.
    Processing,

    /// Walk finished; `outcome` is populated.
    Completed,

    /// Processing failed; `error` is populated.
    Error,
}

/// One results-cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEntry {
    /// Caller-supplied document identity (e.g. a filename).
    pub document_id: String,

    /// Unique id for this processing run.
    pub job: Uuid,

    /// Current lifecycle state.
    pub status: JobStatus,

    /// When the worker claimed the document.
    pub started_at: DateTime<Utc>,

    /// When the terminal state was reached.
    pub finished_at: Option<DateTime<Utc>>,

    /// Present iff `status == Completed`.
    pub outcome: Option<DocumentOutcome>,

    /// Present iff `status == Error`.
    pub error: Option<String>,
}

impl JobEntry {
    /// A fresh `Processing` entry.
    pub fn processing(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            job: Uuid::new_v4(),
            status: JobStatus::Processing,
            started_at: Utc::now(),
            finished_at: None,
            outcome: None,
            error: None,
        }
    }

    /// True once the entry reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Error)
    }
}

/// Storage contract for the results cache.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Claim a document id. Returns `false` when the id already exists
    /// (some worker owns or owned it); the caller must then skip it.
    async fn begin(&self, document_id: &str) -> Result<bool>;

    /// Transition a claimed entry to `Completed` with its outcome.
    async fn complete(&self, document_id: &str, outcome: DocumentOutcome) -> Result<()>;

    /// Transition a claimed entry to `Error` with a message.
    async fn fail(&self, document_id: &str, message: &str) -> Result<()>;

    /// Fetch one entry.
    async fn get(&self, document_id: &str) -> Result<Option<JobEntry>>;

    /// List `(document_id, status)` pairs for all entries.
    async fn statuses(&self) -> Result<Vec<(String, JobStatus)>>;
}

/// Cosine similarity between two vectors; 0.0 on dimension mismatch or
/// zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
