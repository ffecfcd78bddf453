//! Typed errors for the extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur during extraction operations.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Language-model call failed (network, quota, malformed response).
    ///
    /// The pipeline catches this at the call site and degrades the
    /// affected leaf; it only surfaces from the model trait itself.
    #[error("model error: {0}")]
    Model(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Embedding call failed.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Schema descriptor failed validation.
    #[error("invalid schema at {path}: {reason}")]
    InvalidSchema { path: String, reason: String },

    /// Operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Results-cache entry is in the wrong state for the operation.
    #[error("cache entry {id}: {reason}")]
    Cache { id: String, reason: String },

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration error (missing credentials, bad threshold, etc).
    #[error("config error: {0}")]
    Config(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ExtractionError {
    /// Wrap an arbitrary error as a model transport failure.
    pub fn model(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Model(err.into())
    }

    /// Wrap an arbitrary error as a configuration failure.
    pub fn config(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Config(err.into())
    }
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;
