//! Document processor - gate, walk, and cache for batches of documents.
//!
//! Each document is claimed in the results cache exactly once, processed
//! by one worker (gate first, then the schema walk), and transitioned to
//! `Completed` or `Error`. A shutdown request stops new work; documents
//! interrupted mid-walk stay `Processing` and are never readable as
//! complete.

use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ExtractionError, Result};
use crate::pipeline::gate::RelevanceGate;
use crate::pipeline::grounding::Grounding;
use crate::pipeline::walker::SchemaWalker;
use crate::traits::model::LanguageModel;
use crate::traits::store::ResultStore;
use crate::types::config::{ExtractorConfig, ProcessorConfig};
use crate::types::document::SourceDocument;
use crate::types::record::DocumentOutcome;
use crate::types::schema::SchemaNode;

/// One document queued for processing.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    /// Caller-supplied identity (e.g. a filename); keys the cache.
    pub id: String,

    /// The raw text to extract from.
    pub text: String,
}

impl DocumentInput {
    /// Create an input from an id and its text.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Drives the pipeline over documents against one schema.
pub struct Processor<M, G, S> {
    schema: Arc<SchemaNode>,
    walker: SchemaWalker<M, G>,
    gate: RelevanceGate<M>,
    store: Arc<S>,
    config: ProcessorConfig,
}

impl<M, G, S> Processor<M, G, S>
where
    M: LanguageModel + 'static,
    G: Grounding + 'static,
    S: ResultStore + 'static,
{
    /// Create a processor.
    ///
    /// Validates the schema up front; descriptor problems are fatal here,
    /// never per-document.
    pub fn new(
        schema: SchemaNode,
        model: Arc<M>,
        grounding: Arc<G>,
        store: Arc<S>,
        extractor_config: ExtractorConfig,
        config: ProcessorConfig,
    ) -> Result<Self> {
        schema.validate()?;
        Ok(Self {
            schema: Arc::new(schema),
            walker: SchemaWalker::new(Arc::clone(&model), grounding, extractor_config),
            gate: RelevanceGate::new(model),
            store,
            config,
        })
    }

    /// The results cache.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Process one document end to end, updating the cache.
    ///
    /// Returns `None` when the id was already claimed by another worker.
    pub async fn process(
        &self,
        input: DocumentInput,
        cancel: &CancellationToken,
    ) -> Result<Option<DocumentOutcome>> {
        if !self.store.begin(&input.id).await? {
            debug!(id = %input.id, "document already claimed; skipping");
            return Ok(None);
        }

        match self.run_document(&input, cancel).await {
            Ok(outcome) => {
                self.store.complete(&input.id, outcome.clone()).await?;
                info!(id = %input.id, "document completed");
                Ok(Some(outcome))
            }
            Err(ExtractionError::Cancelled) => {
                // Entry deliberately left in Processing: a partial walk
                // must never be readable as complete.
                info!(id = %input.id, "document interrupted by shutdown");
                Err(ExtractionError::Cancelled)
            }
            Err(err) => {
                warn!(id = %input.id, error = %err, "document failed");
                self.store.fail(&input.id, &err.to_string()).await?;
                Err(err)
            }
        }
    }

    async fn run_document(
        &self,
        input: &DocumentInput,
        cancel: &CancellationToken,
    ) -> Result<DocumentOutcome> {
        let doc = SourceDocument::new(input.text.clone());

        if self.config.gate_enabled {
            if cancel.is_cancelled() {
                return Err(ExtractionError::Cancelled);
            }
            let decision = self.gate.classify(&doc).await;
            if !decision.relevant {
                info!(id = %input.id, diagnostic = ?decision.diagnostic, "document excluded by gate");
                return Ok(DocumentOutcome::NotRelevant {
                    diagnostic: decision.diagnostic,
                });
            }
        }

        let output = self
            .walker
            .walk_with_cancel(&self.schema, &doc, cancel)
            .await?;
        Ok(DocumentOutcome::Extracted(output))
    }

    /// Process a batch with a bounded worker pool, yielding
    /// `(document id, result)` pairs as workers finish.
    ///
    /// Pool size comes from `ProcessorConfig::max_workers` (1 in the
    /// reference deployment). Cancellation stops unstarted documents and
    /// interrupts in-flight walks at their next leaf boundary.
    pub fn process_stream<'a>(
        &'a self,
        inputs: Vec<DocumentInput>,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Stream<Item = (String, Result<Option<DocumentOutcome>>)> + Send + 'a>> {
        let workers = self.config.max_workers.max(1);

        Box::pin(
            stream::iter(inputs.into_iter().map(move |input| {
                let cancel = cancel.clone();
                async move {
                    let id = input.id.clone();
                    if cancel.is_cancelled() {
                        return (id, Err(ExtractionError::Cancelled));
                    }
                    let result = self.process(input, &cancel).await;
                    (id, result)
                }
            }))
            .buffer_unordered(workers),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::grounding::SubstringGrounding;
    use crate::stores::memory::MemoryResultStore;
    use crate::testing::MockModel;
    use crate::traits::store::JobStatus;

    fn processor(
        model: MockModel,
        config: ProcessorConfig,
    ) -> Processor<MockModel, SubstringGrounding, MemoryResultStore> {
        let schema = SchemaNode::object([("city", SchemaNode::scalar("Pickup City"))]);
        Processor::new(
            schema,
            Arc::new(model),
            Arc::new(SubstringGrounding::new()),
            Arc::new(MemoryResultStore::new()),
            ExtractorConfig::default(),
            config,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_relevant_document_is_walked_and_completed() {
        let model = MockModel::new()
            .with_response("triage classifier", "true")
            .with_response("Pickup City", "Dallas");
        let proc = processor(model, ProcessorConfig::default());

        let outcome = proc
            .process(
                DocumentInput::new("a.eml", "Pickup in Dallas, TX."),
                &CancellationToken::new(),
            )
            .await
            .unwrap()
            .unwrap();

        match outcome {
            DocumentOutcome::Extracted(output) => {
                assert_eq!(output.record.to_json()["city"], "Dallas");
            }
            other => panic!("expected extraction, got {other:?}"),
        }

        let entry = proc.store().get("a.eml").await.unwrap().unwrap();
        assert_eq!(entry.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_irrelevant_document_short_circuits() {
        let model = MockModel::new().with_response("triage classifier", "false");
        let calls = model.call_log();
        let proc = processor(model, ProcessorConfig::default());

        let outcome = proc
            .process(
                DocumentInput::new("spam.eml", "BUY NOW!!!"),
                &CancellationToken::new(),
            )
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(outcome, DocumentOutcome::NotRelevant { .. }));
        // one gate call, zero leaf calls
        assert_eq!(calls.read().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_gate_disabled_walks_everything() {
        let model = MockModel::new().with_response("Pickup City", "Dallas");
        let proc = processor(model, ProcessorConfig::default().without_gate());

        let outcome = proc
            .process(
                DocumentInput::new("a.eml", "Pickup in Dallas, TX."),
                &CancellationToken::new(),
            )
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(outcome, DocumentOutcome::Extracted(_)));
    }

    #[tokio::test]
    async fn test_duplicate_id_is_skipped() {
        let model = MockModel::new().with_response("triage classifier", "true");
        let proc = processor(model, ProcessorConfig::default());
        let cancel = CancellationToken::new();

        proc.process(DocumentInput::new("a.eml", "text"), &cancel)
            .await
            .unwrap();
        let second = proc
            .process(DocumentInput::new("a.eml", "text"), &cancel)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_document_stays_processing() {
        let model = MockModel::new().with_response("triage classifier", "true");
        let proc = processor(model, ProcessorConfig::default());

        let cancel = CancellationToken::new();
        cancel.cancel();

        // claimed, then interrupted before the first leaf
        let result = proc
            .process(DocumentInput::new("a.eml", "Pickup in Dallas."), &cancel)
            .await;
        assert!(matches!(result, Err(ExtractionError::Cancelled)));

        let entry = proc.store().get("a.eml").await.unwrap().unwrap();
        assert_eq!(entry.status, JobStatus::Processing);
    }

    #[tokio::test]
    async fn test_stream_processes_batch() {
        let model = MockModel::new()
            .with_response("triage classifier", "true")
            .with_response("Pickup City", "Dallas");
        let proc = processor(model, ProcessorConfig::default().with_max_workers(2));

        let inputs = vec![
            DocumentInput::new("a.eml", "Pickup in Dallas."),
            DocumentInput::new("b.eml", "Pickup in Dallas."),
        ];

        let results: Vec<_> = proc
            .process_stream(inputs, CancellationToken::new())
            .collect()
            .await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, r)| r.is_ok()));

        let statuses = proc.store().statuses().await.unwrap();
        assert_eq!(statuses.len(), 2);
        assert!(statuses.iter().all(|(_, s)| *s == JobStatus::Completed));
    }
}
