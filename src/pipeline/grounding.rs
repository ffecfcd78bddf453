//! Grounding - deciding whether a candidate value is supported by the
//! source document.
//!
//! Two interchangeable strategies sit behind one trait: exact
//! case-insensitive containment, and embedding-similarity thresholding.
//! The field extractor calls the trait and never knows which is active.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use crate::traits::model::Embedder;
use crate::traits::store::cosine_similarity;
use crate::types::document::SourceDocument;

/// Verdict for one candidate value against one document.
///
/// Ephemeral: produced inside the retry loop and not retained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    /// Whether the candidate is supported by the document.
    pub supported: bool,

    /// Similarity score, when the strategy computes one.
    pub score: Option<f32>,
}

impl Verdict {
    /// A supported verdict without a score.
    pub fn supported() -> Self {
        Self {
            supported: true,
            score: None,
        }
    }

    /// An unsupported verdict without a score.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            score: None,
        }
    }

    /// Attach a similarity score.
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

/// The grounding oracle contract.
#[async_trait]
pub trait Grounding: Send + Sync {
    /// Check one candidate against one document.
    ///
    /// Must not fail: strategies that call external services map their
    /// transport errors to an unsupported verdict.
    async fn verify(&self, candidate: &str, doc: &SourceDocument) -> Verdict;
}

#[async_trait]
impl<G: Grounding + ?Sized> Grounding for Arc<G> {
    async fn verify(&self, candidate: &str, doc: &SourceDocument) -> Verdict {
        (**self).verify(candidate, doc).await
    }
}

/// Case-insensitive substring containment.
///
/// Deterministic and free of external calls, but rejects paraphrases and
/// reformatted values (e.g. a number the model normalized).
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringGrounding;

impl SubstringGrounding {
    /// Create the substring strategy.
    pub fn new() -> Self {
        Self
    }

    /// The containment rule itself, shared with the async trait impl.
    pub fn contains(candidate: &str, doc: &SourceDocument) -> bool {
        doc.lowered().contains(&candidate.to_lowercase())
    }
}

#[async_trait]
impl Grounding for SubstringGrounding {
    async fn verify(&self, candidate: &str, doc: &SourceDocument) -> Verdict {
        if Self::contains(candidate, doc) {
            Verdict::supported()
        } else {
            Verdict::unsupported()
        }
    }
}

/// Embedding-similarity thresholding.
///
/// The document is segmented by non-empty lines; segment embeddings are
/// computed once per document (keyed by content hash) and cached. A
/// candidate is supported when its max cosine similarity against any
/// segment meets the threshold. Costs one embedding call per check plus
/// one batch per new document; use it only where substring checking
/// rejects too aggressively.
pub struct EmbeddingGrounding<E> {
    embedder: Arc<E>,
    threshold: f32,
    segment_cache: RwLock<HashMap<String, Arc<Vec<Vec<f32>>>>>,
}

impl<E: Embedder> EmbeddingGrounding<E> {
    /// Default acceptance threshold.
    pub const DEFAULT_THRESHOLD: f32 = 0.8;

    /// Create the embedding strategy over a shared embedder.
    pub fn new(embedder: Arc<E>) -> Self {
        Self::with_threshold(embedder, Self::DEFAULT_THRESHOLD)
    }

    /// Create with a custom acceptance threshold.
    pub fn with_threshold(embedder: Arc<E>, threshold: f32) -> Self {
        Self {
            embedder,
            threshold,
            segment_cache: RwLock::new(HashMap::new()),
        }
    }

    /// The acceptance threshold.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    async fn segment_embeddings(
        &self,
        doc: &SourceDocument,
    ) -> crate::error::Result<Arc<Vec<Vec<f32>>>> {
        if let Some(cached) = self
            .segment_cache
            .read()
            .unwrap()
            .get(doc.content_hash())
            .cloned()
        {
            return Ok(cached);
        }

        let segments = doc.segments();
        let embedded = Arc::new(self.embedder.embed_batch(&segments).await?);
        self.segment_cache
            .write()
            .unwrap()
            .insert(doc.content_hash().to_string(), Arc::clone(&embedded));
        Ok(embedded)
    }
}

#[async_trait]
impl<E: Embedder> Grounding for EmbeddingGrounding<E> {
    async fn verify(&self, candidate: &str, doc: &SourceDocument) -> Verdict {
        let segments = match self.segment_embeddings(doc).await {
            Ok(segments) => segments,
            Err(err) => {
                warn!(error = %err, "segment embedding failed; treating candidate as ungrounded");
                return Verdict::unsupported();
            }
        };

        let candidate_embedding = match self.embedder.embed(candidate).await {
            Ok(embedding) => embedding,
            Err(err) => {
                warn!(error = %err, "candidate embedding failed; treating as ungrounded");
                return Verdict::unsupported();
            }
        };

        let best = segments
            .iter()
            .map(|segment| cosine_similarity(&candidate_embedding, segment))
            .fold(f32::MIN, f32::max);

        let best = if best == f32::MIN { 0.0 } else { best };
        debug!(score = best, threshold = self.threshold, "embedding grounding check");

        Verdict {
            supported: best >= self.threshold,
            score: Some(best),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use proptest::prelude::*;

    #[tokio::test]
    async fn test_substring_is_case_insensitive() {
        let doc = SourceDocument::new("Ruta: Celaya, Gto. Mexico -> Columbus, IN");
        let oracle = SubstringGrounding::new();

        assert!(oracle.verify("celaya", &doc).await.supported);
        assert!(oracle.verify("COLUMBUS, IN", &doc).await.supported);
        assert!(!oracle.verify("Dallas", &doc).await.supported);
    }

    #[tokio::test]
    async fn test_substring_has_no_score() {
        let doc = SourceDocument::new("3 pallets per day");
        let verdict = SubstringGrounding::new().verify("pallets", &doc).await;
        assert_eq!(verdict.score, None);
    }

    proptest! {
        // supported == lower(candidate) contained in lower(doc), for ASCII input
        #[test]
        fn prop_substring_matches_containment(
            candidate in "[ -~]{0,12}",
            doc_text in "[ -~]{0,64}",
        ) {
            let doc = SourceDocument::new(doc_text.clone());
            let expected = doc_text.to_lowercase().contains(&candidate.to_lowercase());
            prop_assert_eq!(SubstringGrounding::contains(&candidate, &doc), expected);
        }

        #[test]
        fn prop_substring_accepts_exact_spans(
            prefix in "[ -~]{0,20}",
            span in "[a-zA-Z0-9 ]{1,10}",
            suffix in "[ -~]{0,20}",
        ) {
            let doc = SourceDocument::new(format!("{prefix}{span}{suffix}"));
            prop_assert!(SubstringGrounding::contains(&span, &doc));
        }
    }

    /// Embedder that maps known texts to fixed unit vectors.
    struct StubEmbedder {
        axis: fn(&str) -> usize,
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0f32; 4];
            v[(self.axis)(text) % 4] = 1.0;
            Ok(v)
        }
    }

    #[tokio::test]
    async fn test_embedding_grounding_accepts_aligned_candidate() {
        // every text on the same axis: similarity 1.0
        let embedder = Arc::new(StubEmbedder { axis: |_| 0 });
        let oracle = EmbeddingGrounding::with_threshold(embedder, 0.9);
        let doc = SourceDocument::new("line one\nline two");

        let verdict = oracle.verify("anything", &doc).await;
        assert!(verdict.supported);
        assert!(verdict.score.unwrap() > 0.99);
    }

    #[tokio::test]
    async fn test_embedding_grounding_rejects_orthogonal_candidate() {
        // candidate lands on a different axis than every segment
        let embedder = Arc::new(StubEmbedder {
            axis: |text| if text == "alien" { 1 } else { 0 },
        });
        let oracle = EmbeddingGrounding::with_threshold(embedder, 0.5);
        let doc = SourceDocument::new("line one\nline two");

        let verdict = oracle.verify("alien", &doc).await;
        assert!(!verdict.supported);
        assert_eq!(verdict.score, Some(0.0));
    }

    #[tokio::test]
    async fn test_embedding_grounding_caches_segments_per_document() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingEmbedder(AtomicUsize);

        #[async_trait]
        impl Embedder for CountingEmbedder {
            async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(vec![1.0, 0.0])
            }
        }

        let embedder = Arc::new(CountingEmbedder(AtomicUsize::new(0)));
        let oracle = EmbeddingGrounding::new(Arc::clone(&embedder));
        let doc = SourceDocument::new("one\ntwo\nthree");

        oracle.verify("first", &doc).await;
        let after_first = embedder.0.load(Ordering::SeqCst);
        oracle.verify("second", &doc).await;
        let after_second = embedder.0.load(Ordering::SeqCst);

        // 3 segments + 1 candidate, then only 1 more candidate
        assert_eq!(after_first, 4);
        assert_eq!(after_second, 5);
    }
}
