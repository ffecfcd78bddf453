//! Configuration types for the extraction pipeline.

use serde::{Deserialize, Serialize};

/// Configuration for field and list extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Total model calls allowed per scalar leaf before degrading to null.
    ///
    /// Default: 3.
    pub max_retries: u32,

    /// The literal answer the model uses to signal "value not found".
    ///
    /// Compared against the trimmed raw answer, case-sensitively.
    /// Default: `N/A`.
    pub sentinel: String,

    /// Max output tokens for a single-field query. Default: 64.
    pub field_max_tokens: u32,

    /// Max output tokens for a list query. Default: 512.
    pub list_max_tokens: u32,

    /// Keywords whose presence makes a boolean answer true
    /// (case-insensitive containment).
    ///
    /// Deliberately permissive; tune per deployment.
    /// Default: `yes`, `true`, `stackable`.
    #[serde(default)]
    pub truthy_keywords: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            sentinel: "N/A".to_string(),
            field_max_tokens: 64,
            list_max_tokens: 512,
            truthy_keywords: vec![
                "yes".to_string(),
                "true".to_string(),
                "stackable".to_string(),
            ],
        }
    }
}

impl ExtractorConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-leaf retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set the not-found sentinel.
    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = sentinel.into();
        self
    }

    /// Replace the truthy keyword list.
    pub fn with_truthy_keywords(
        mut self,
        keywords: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.truthy_keywords = keywords.into_iter().map(|k| k.into()).collect();
        self
    }
}

/// Configuration for the document processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Run the relevance gate before walking each document.
    ///
    /// Skipping it saves one classification call per document but spends
    /// a full walk on irrelevant ones. Default: true.
    pub gate_enabled: bool,

    /// Maximum documents processed concurrently. Default: 1.
    pub max_workers: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            gate_enabled: true,
            max_workers: 1,
        }
    }
}

impl ProcessorConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable the relevance gate.
    pub fn without_gate(mut self) -> Self {
        self.gate_enabled = false;
        self
    }

    /// Set the worker-pool bound.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtractorConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.sentinel, "N/A");
        assert!(config.truthy_keywords.contains(&"stackable".to_string()));

        let proc = ProcessorConfig::default();
        assert!(proc.gate_enabled);
        assert_eq!(proc.max_workers, 1);
    }

    #[test]
    fn test_builders_clamp_to_sane_values() {
        let config = ExtractorConfig::new().with_max_retries(0);
        assert_eq!(config.max_retries, 1);

        let proc = ProcessorConfig::new().with_max_workers(0);
        assert_eq!(proc.max_workers, 1);
    }
}
