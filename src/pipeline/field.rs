//! Single-field extraction with grounding and bounded retry.
//!
//! The retry loop is an explicit state machine rather than implicit
//! iteration, so the attempt bound and every terminal outcome are
//! independently testable:
//!
//! ```text
//! Querying -> Validating -> Success
//!                         | Retry (ungrounded or uncoercible) -> Querying
//!                         | Exhausted (attempt budget spent)
//! ```
//!
//! The not-found sentinel and transport failures terminate immediately
//! without touching the retry budget.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::pipeline::coerce::coerce;
use crate::pipeline::grounding::Grounding;
use crate::pipeline::prompts::{format_field_prompt, format_field_system_prompt};
use crate::traits::model::{LanguageModel, SamplingConfig};
use crate::types::config::ExtractorConfig;
use crate::types::document::SourceDocument;
use crate::types::record::{FieldValue, LeafOutcome};
use crate::types::schema::ValueType;

/// Why an attempt was rejected and retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RejectReason {
    /// The grounding oracle could not verify the answer.
    Ungrounded,

    /// Grounded, but the answer failed type coercion.
    Uncoercible,
}

/// State of the bounded-attempt machine.
#[derive(Debug)]
enum FieldState {
    /// About to issue model call number `attempt`.
    Querying { attempt: u32 },

    /// Holding a raw answer, about to ground and coerce it.
    Validating { attempt: u32, raw: String },

    /// Terminal: a verified, typed value.
    Success(FieldValue),

    /// An attempt was rejected; loop back to `Querying` if budget remains.
    Retry { attempt: u32, reason: RejectReason },

    /// Terminal: retry budget spent without a verified value.
    Exhausted { attempts: u32 },

    /// Terminal: sentinel answer, value absent from the document.
    NotFound,

    /// Terminal: the model call itself failed.
    ModelFailed,
}

/// Extracts one scalar field per call.
pub struct FieldExtractor<M, G> {
    model: Arc<M>,
    grounding: Arc<G>,
    config: ExtractorConfig,
}

impl<M: LanguageModel, G: Grounding> FieldExtractor<M, G> {
    /// Create an extractor over injected model and oracle.
    pub fn new(model: Arc<M>, grounding: Arc<G>, config: ExtractorConfig) -> Self {
        Self {
            model,
            grounding,
            config,
        }
    }

    /// Extract one field. Never fails: every failure mode degrades to
    /// `Null` with a reporting outcome.
    ///
    /// `inferred` fields skip the grounding check (their value is derived
    /// from the document, not quoted from it).
    pub async fn extract(
        &self,
        doc: &SourceDocument,
        description: &str,
        value_type: ValueType,
        inferred: bool,
    ) -> (FieldValue, LeafOutcome) {
        let mut state = FieldState::Querying { attempt: 1 };

        loop {
            state = match state {
                FieldState::Querying { attempt } => self.query(doc, description, attempt).await,
                FieldState::Validating { attempt, raw } => {
                    self.validate(doc, description, value_type, inferred, attempt, raw)
                        .await
                }
                FieldState::Retry { attempt, reason } => {
                    if attempt >= self.config.max_retries {
                        FieldState::Exhausted { attempts: attempt }
                    } else {
                        debug!(field = description, attempt, ?reason, "retrying extraction");
                        FieldState::Querying {
                            attempt: attempt + 1,
                        }
                    }
                }
                FieldState::Success(value) => {
                    return (value, LeafOutcome::Extracted);
                }
                FieldState::NotFound => {
                    info!(field = description, "value not found in document");
                    return (FieldValue::Null, LeafOutcome::NotFound);
                }
                FieldState::Exhausted { attempts } => {
                    warn!(field = description, attempts, "no verifiable value; degrading to null");
                    return (FieldValue::Null, LeafOutcome::Exhausted { attempts });
                }
                FieldState::ModelFailed => {
                    return (FieldValue::Null, LeafOutcome::ModelError);
                }
            };
        }
    }

    async fn query(&self, doc: &SourceDocument, description: &str, attempt: u32) -> FieldState {
        let system = format_field_system_prompt(&self.config.sentinel);
        let user = format_field_prompt(description, doc.text());
        let sampling = SamplingConfig::deterministic(self.config.field_max_tokens);

        match self.model.complete(&system, &user, &sampling).await {
            Ok(raw) => FieldState::Validating { attempt, raw },
            Err(err) => {
                // Transport failure maps to the not-found path; the retry
                // budget is for bad answers, not a dead endpoint.
                warn!(field = description, error = %err, "model call failed");
                FieldState::ModelFailed
            }
        }
    }

    async fn validate(
        &self,
        doc: &SourceDocument,
        description: &str,
        value_type: ValueType,
        inferred: bool,
        attempt: u32,
        raw: String,
    ) -> FieldState {
        let answer = raw.trim();

        // Sentinel check precedes grounding: "absent" costs no oracle call.
        if answer == self.config.sentinel {
            return FieldState::NotFound;
        }

        if !inferred {
            let verdict = self.grounding.verify(answer, doc).await;
            if !verdict.supported {
                debug!(
                    field = description,
                    candidate = answer,
                    score = ?verdict.score,
                    "candidate not grounded in document"
                );
                return FieldState::Retry {
                    attempt,
                    reason: RejectReason::Ungrounded,
                };
            }
        }

        match coerce(answer, value_type, &self.config.truthy_keywords) {
            Ok(value) => FieldState::Success(value),
            Err(err) => {
                debug!(field = description, error = %err, "coercion failed");
                FieldState::Retry {
                    attempt,
                    reason: RejectReason::Uncoercible,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::grounding::SubstringGrounding;
    use crate::testing::{MockCall, MockModel, RecordingGrounding};

    fn extractor(
        model: MockModel,
        max_retries: u32,
    ) -> FieldExtractor<MockModel, RecordingGrounding<SubstringGrounding>> {
        FieldExtractor::new(
            Arc::new(model),
            Arc::new(RecordingGrounding::new(SubstringGrounding::new())),
            ExtractorConfig::default().with_max_retries(max_retries),
        )
    }

    #[tokio::test]
    async fn test_grounded_answer_is_returned() {
        let model = MockModel::new().with_response("Pickup City", "Dallas");
        let ex = extractor(model, 3);
        let doc = SourceDocument::new("Pickup in Dallas, TX.");

        let (value, outcome) = ex.extract(&doc, "Pickup City", ValueType::String, false).await;
        assert_eq!(value, FieldValue::Text("Dallas".to_string()));
        assert_eq!(outcome, LeafOutcome::Extracted);
    }

    #[tokio::test]
    async fn test_sentinel_returns_null_with_zero_grounding_calls() {
        let model = MockModel::new().with_response("Pickup City", "N/A");
        let grounding = Arc::new(RecordingGrounding::new(SubstringGrounding::new()));
        let ex = FieldExtractor::new(
            Arc::new(model),
            Arc::clone(&grounding),
            ExtractorConfig::default(),
        );
        let doc = SourceDocument::new("No locations here.");

        let (value, outcome) = ex.extract(&doc, "Pickup City", ValueType::String, false).await;
        assert_eq!(value, FieldValue::Null);
        assert_eq!(outcome, LeafOutcome::NotFound);
        assert_eq!(grounding.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ungrounded_answer_exhausts_retry_budget() {
        let model = MockModel::new().with_response("Pickup City", "Paris");
        let ex = extractor(model, 3);
        let doc = SourceDocument::new("Pickup in Dallas, TX.");

        let (value, outcome) = ex.extract(&doc, "Pickup City", ValueType::String, false).await;
        assert_eq!(value, FieldValue::Null);
        assert_eq!(outcome, LeafOutcome::Exhausted { attempts: 3 });
    }

    #[tokio::test]
    async fn test_retry_bound_limits_model_calls() {
        let model = MockModel::new().with_response("Pickup City", "Paris");
        let calls = model.call_log();
        let ex = extractor(model, 4);
        let doc = SourceDocument::new("Pickup in Dallas, TX.");

        ex.extract(&doc, "Pickup City", ValueType::String, false).await;

        let completions = calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, MockCall::Complete { .. }))
            .count();
        assert_eq!(completions, 4);
    }

    #[tokio::test]
    async fn test_grounded_but_uncoercible_retries_then_succeeds() {
        let model = MockModel::new()
            .with_response_sequence("Total Miles", ["roughly 900 miles", "900"]);
        let ex = extractor(model, 3);
        let doc = SourceDocument::new("Distance: roughly 900 miles in total.");

        let (value, outcome) = ex.extract(&doc, "Total Miles", ValueType::Number, false).await;
        assert_eq!(value, FieldValue::Integer(900));
        assert_eq!(outcome, LeafOutcome::Extracted);
    }

    #[tokio::test]
    async fn test_inferred_field_skips_grounding() {
        let model = MockModel::new().with_response("Language of the text", "Spanish");
        let grounding = Arc::new(RecordingGrounding::new(SubstringGrounding::new()));
        let ex = FieldExtractor::new(
            Arc::new(model),
            Arc::clone(&grounding),
            ExtractorConfig::default(),
        );
        // "Spanish" never appears in the text; the field is derived.
        let doc = SourceDocument::new("Buen dia, me apoyan con las cotizaciones");

        let (value, outcome) = ex
            .extract(&doc, "Language of the text", ValueType::String, true)
            .await;
        assert_eq!(value, FieldValue::Text("Spanish".to_string()));
        assert_eq!(outcome, LeafOutcome::Extracted);
        assert_eq!(grounding.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_degrades_without_retry() {
        let model = MockModel::new().failing();
        let calls = model.call_log();
        let ex = extractor(model, 3);
        let doc = SourceDocument::new("Pickup in Dallas, TX.");

        let (value, outcome) = ex.extract(&doc, "Pickup City", ValueType::String, false).await;
        assert_eq!(value, FieldValue::Null);
        assert_eq!(outcome, LeafOutcome::ModelError);
        assert_eq!(calls.read().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_boolean_heuristic_applies_after_grounding() {
        let model = MockModel::new().with_response("Stackable", "stackable");
        let ex = extractor(model, 3);
        let doc = SourceDocument::new("Freight is stackable, 12 pieces.");

        let (value, outcome) = ex.extract(&doc, "Stackable", ValueType::Boolean, false).await;
        assert_eq!(value, FieldValue::Bool(true));
        assert_eq!(outcome, LeafOutcome::Extracted);
    }
}
