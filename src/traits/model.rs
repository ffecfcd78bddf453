//! Model traits - the LLM and embedding capabilities the pipeline consumes.
//!
//! Implementations wrap specific providers and handle the specifics of
//! transport and response parsing. The pipeline only ever sees these
//! traits, so tests can substitute deterministic fakes.

use async_trait::async_trait;

use crate::error::Result;

/// Sampling parameters for one completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingConfig {
    /// Sampling temperature. The pipeline always pins this to zero.
    pub temperature: f32,

    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl SamplingConfig {
    /// Deterministic sampling (temperature 0) with the given output bound.
    pub fn deterministic(max_tokens: u32) -> Self {
        Self {
            temperature: 0.0,
            max_tokens,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self::deterministic(256)
    }
}

/// A text-completion capability.
///
/// Failure (network, quota, malformed response) is returned as an error;
/// the pipeline catches it at each call site and degrades the affected
/// leaf rather than propagating a crash.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one completion with a system instruction and a user prompt.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        sampling: &SamplingConfig,
    ) -> Result<String>;
}

/// An embedding capability for similarity-based grounding.
///
/// Held as shared, read-only process-wide state: constructed once at
/// startup and never reloaded mid-run.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch operation).
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        // Default implementation calls embed sequentially
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

#[async_trait]
impl<M: LanguageModel + ?Sized> LanguageModel for std::sync::Arc<M> {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        sampling: &SamplingConfig,
    ) -> Result<String> {
        (**self).complete(system, user, sampling).await
    }
}

#[async_trait]
impl<E: Embedder + ?Sized> Embedder for std::sync::Arc<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_sampling() {
        let sampling = SamplingConfig::deterministic(64);
        assert_eq!(sampling.temperature, 0.0);
        assert_eq!(sampling.max_tokens, 64);
    }
}
