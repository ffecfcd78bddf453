//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the library
//! without making real model or embedding calls.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{ExtractionError, Result};
use crate::pipeline::grounding::{Grounding, Verdict};
use crate::traits::model::{Embedder, LanguageModel, SamplingConfig};
use crate::types::document::SourceDocument;
use crate::types::schema::SchemaNode;

/// Record of a call made to the mock model.
#[derive(Debug, Clone)]
pub enum MockCall {
    /// A completion request.
    Complete {
        /// The system instruction.
        system: String,
        /// The user prompt.
        user: String,
    },

    /// An embedding request.
    Embed {
        /// Length of the embedded text.
        text_len: usize,
    },
}

/// A deterministic mock language model and embedder.
///
/// Responses are scripted by key: the first (longest) key found as a
/// substring of the system or user prompt wins. A key may carry a
/// sequence of responses, consumed one per call, with the last response
/// repeating. Unscripted prompts get the not-found sentinel (or `[]`
/// for list prompts), so walks over unscripted schemas still terminate.
#[derive(Default)]
pub struct MockModel {
    responses: Arc<RwLock<HashMap<String, VecDeque<String>>>>,

    /// Predefined embeddings by text
    embeddings: Arc<RwLock<HashMap<String, Vec<f32>>>>,

    /// Default embedding dimension
    embedding_dim: usize,

    /// When set, every completion fails with a transport error
    fail_completions: bool,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockCall>>>,
}

impl MockModel {
    /// Create a new mock with default behavior.
    pub fn new() -> Self {
        Self {
            embedding_dim: 256,
            ..Default::default()
        }
    }

    /// Script a fixed response for prompts containing `key`.
    pub fn with_response(self, key: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap()
            .insert(key.into(), VecDeque::from([response.into()]));
        self
    }

    /// Script a sequence of responses for prompts containing `key`; the
    /// last response repeats once the sequence is consumed.
    pub fn with_response_sequence(
        self,
        key: impl Into<String>,
        responses: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.responses.write().unwrap().insert(
            key.into(),
            responses.into_iter().map(|r| r.into()).collect(),
        );
        self
    }

    /// Add a predefined embedding for a text.
    pub fn with_embedding(self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.embeddings
            .write()
            .unwrap()
            .insert(text.into(), embedding);
        self
    }

    /// Set the embedding dimension.
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    /// Make every completion fail with a transport error.
    pub fn failing(mut self) -> Self {
        self.fail_completions = true;
        self
    }

    /// Shared handle to the call log, for assertions.
    pub fn call_log(&self) -> Arc<RwLock<Vec<MockCall>>> {
        Arc::clone(&self.calls)
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.read().unwrap().clone()
    }

    /// Number of completion calls made so far.
    pub fn completion_count(&self) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, MockCall::Complete { .. }))
            .count()
    }

    fn scripted_response(&self, system: &str, user: &str) -> Option<String> {
        let mut responses = self.responses.write().unwrap();

        // longest matching key wins, so scripts stay deterministic when
        // one key is a substring of another
        let key = responses
            .keys()
            .filter(|key| system.contains(key.as_str()) || user.contains(key.as_str()))
            .max_by_key(|key| key.len())?
            .clone();

        let queue = responses.get_mut(&key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    /// Generate a deterministic embedding based on text.
    fn generate_deterministic_embedding(&self, text: &str) -> Vec<f32> {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let hash = hasher.finalize();

        (0..self.embedding_dim)
            .map(|i| {
                let byte = hash[i % 32] as f32;
                // Normalize to [-1, 1] range
                (byte / 127.5) - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        _sampling: &SamplingConfig,
    ) -> Result<String> {
        self.calls.write().unwrap().push(MockCall::Complete {
            system: system.to_string(),
            user: user.to_string(),
        });

        if self.fail_completions {
            return Err(ExtractionError::model("mock transport failure"));
        }

        if let Some(response) = self.scripted_response(system, user) {
            return Ok(response);
        }

        // Sensible defaults: empty array for list prompts, the sentinel
        // otherwise.
        if system.contains("JSON array") {
            Ok("[]".to_string())
        } else {
            Ok("N/A".to_string())
        }
    }
}

#[async_trait]
impl Embedder for MockModel {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.write().unwrap().push(MockCall::Embed {
            text_len: text.len(),
        });

        Ok(self
            .embeddings
            .read()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.generate_deterministic_embedding(text)))
    }
}

/// A grounding wrapper that counts oracle invocations.
pub struct RecordingGrounding<G> {
    inner: G,
    calls: AtomicUsize,
    candidates: RwLock<Vec<String>>,
}

impl<G: Grounding> RecordingGrounding<G> {
    /// Wrap an oracle.
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            candidates: RwLock::new(Vec::new()),
        }
    }

    /// Number of verify calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Candidates checked so far, in order.
    pub fn candidates(&self) -> Vec<String> {
        self.candidates.read().unwrap().clone()
    }
}

#[async_trait]
impl<G: Grounding> Grounding for RecordingGrounding<G> {
    async fn verify(&self, candidate: &str, doc: &SourceDocument) -> Verdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.candidates
            .write()
            .unwrap()
            .push(candidate.to_string());
        self.inner.verify(candidate, doc).await
    }
}

/// The shipment-request schema used by the reference deployment; handy
/// for realistic tests.
pub fn shipment_schema() -> SchemaNode {
    SchemaNode::object([
        ("language", SchemaNode::inferred_scalar("Language of the text")),
        (
            "shipment",
            SchemaNode::object([
                (
                    "pickup",
                    SchemaNode::object([
                        ("city", SchemaNode::scalar("Pickup City")),
                        ("state", SchemaNode::scalar("Pickup State")),
                        ("zip_code", SchemaNode::scalar("Pickup Zip Code")),
                    ]),
                ),
                (
                    "delivery",
                    SchemaNode::object([
                        ("city", SchemaNode::scalar("Delivery City")),
                        ("state", SchemaNode::scalar("Delivery State")),
                        ("zip_code", SchemaNode::scalar("Delivery Zip Code")),
                    ]),
                ),
                ("pickup_eta", SchemaNode::scalar("Pickup Date or ETA")),
                ("delivery_eta", SchemaNode::scalar("Delivery Date or ETA")),
                ("miles", SchemaNode::number("Total Miles")),
                ("hours", SchemaNode::scalar("Time taken or Hours spent for Delivery")),
                (
                    "dimensions",
                    SchemaNode::object_list([
                        ("length", SchemaNode::number("Length")),
                        ("width", SchemaNode::number("Width")),
                        ("height", SchemaNode::number("Height")),
                    ]),
                ),
                (
                    "others",
                    SchemaNode::object([
                        ("piece_count", SchemaNode::number("Piece Count")),
                        ("stackable", SchemaNode::boolean("Stackable")),
                        ("hazardous", SchemaNode::boolean("Is Hazardous")),
                        ("weight_lbs", SchemaNode::number("Weight in Pounds")),
                        ("us_vehicle", SchemaNode::scalar("US Vehicle")),
                        ("mx_vehicle", SchemaNode::scalar("MX Vehicle")),
                        ("requirements", SchemaNode::scalar("Requirements")),
                    ]),
                ),
            ]),
        ),
        (
            "rates",
            SchemaNode::object([
                ("base_rate", SchemaNode::number("Base Rate")),
                ("starboard_rates", SchemaNode::scalar_list("Starboard Rate")),
            ]),
        ),
    ])
}
