//! Relevance gate - a binary pre-filter ahead of the schema walk.
//!
//! One classification call decides whether a document is worth
//! extracting at all. The gate fails closed: anything but an exact
//! affirmative answer (including transport failure) excludes the
//! document, and errors never propagate past this boundary.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::pipeline::prompts::{format_gate_prompt, GATE_SYSTEM_PROMPT};
use crate::traits::model::{LanguageModel, SamplingConfig};
use crate::types::document::SourceDocument;

/// Outcome of one gate classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    /// Whether the document should be walked.
    pub relevant: bool,

    /// Why an irrelevant verdict was reached, when known.
    pub diagnostic: Option<String>,
}

impl GateDecision {
    fn relevant() -> Self {
        Self {
            relevant: true,
            diagnostic: None,
        }
    }

    fn excluded(diagnostic: impl Into<String>) -> Self {
        Self {
            relevant: false,
            diagnostic: Some(diagnostic.into()),
        }
    }
}

/// The relevance gate.
pub struct RelevanceGate<M> {
    model: Arc<M>,
    max_tokens: u32,
}

impl<M: LanguageModel> RelevanceGate<M> {
    /// Create a gate over an injected model.
    pub fn new(model: Arc<M>) -> Self {
        Self {
            model,
            max_tokens: 8,
        }
    }

    /// Classify one document.
    pub async fn classify(&self, doc: &SourceDocument) -> GateDecision {
        let user = format_gate_prompt(doc.text());
        let sampling = SamplingConfig::deterministic(self.max_tokens);

        let raw = match self
            .model
            .complete(GATE_SYSTEM_PROMPT, &user, &sampling)
            .await
        {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "gate classification failed; excluding document");
                return GateDecision::excluded(format!("classification call failed: {err}"));
            }
        };

        let answer = raw.trim().trim_end_matches('.').to_lowercase();
        debug!(answer = %answer, "gate verdict");
        match answer.as_str() {
            "true" | "yes" => GateDecision::relevant(),
            "false" | "no" => GateDecision::excluded("classified as not relevant"),
            other => GateDecision::excluded(format!("ambiguous gate answer: {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;

    async fn classify(response: &str) -> GateDecision {
        let model = MockModel::new().with_response("triage classifier", response);
        let gate = RelevanceGate::new(Arc::new(model));
        gate.classify(&SourceDocument::new("Rate request for 3 pallets"))
            .await
    }

    #[tokio::test]
    async fn test_affirmative_answers_pass() {
        assert!(classify("true").await.relevant);
        assert!(classify("True.").await.relevant);
        assert!(classify("  YES ").await.relevant);
    }

    #[tokio::test]
    async fn test_negative_and_ambiguous_answers_fail_closed() {
        assert!(!classify("false").await.relevant);
        assert!(!classify("maybe").await.relevant);
        assert!(!classify("It appears to be a contract email, so true").await.relevant);
        assert!(!classify("").await.relevant);
    }

    #[tokio::test]
    async fn test_transport_failure_fails_closed_with_diagnostic() {
        let model = MockModel::new().failing();
        let gate = RelevanceGate::new(Arc::new(model));
        let decision = gate.classify(&SourceDocument::new("anything")).await;

        assert!(!decision.relevant);
        assert!(decision.diagnostic.unwrap().contains("classification call failed"));
    }
}
