//! Rate-limited model wrapper.
//!
//! Wraps any LanguageModel with rate limiting using the governor crate,
//! for serializing calls to a shared, rate-limited endpoint when
//! documents are processed concurrently.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::Result;
use crate::traits::model::{LanguageModel, SamplingConfig};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A model wrapper that enforces request rate limits.
pub struct RateLimitedModel<M> {
    inner: M,
    limiter: Arc<DefaultRateLimiter>,
}

impl<M: LanguageModel> RateLimitedModel<M> {
    /// Create a new rate-limited model.
    ///
    /// # Arguments
    /// * `model` - The underlying model to wrap
    /// * `requests_per_second` - Maximum requests per second (floored to 1)
    pub fn new(model: M, requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        Self::with_quota(model, Quota::per_second(rps))
    }

    /// Create with a custom quota (e.g. per-minute with burst).
    pub fn with_quota(model: M, quota: Quota) -> Self {
        Self {
            inner: model,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Wait for the rate limiter before proceeding.
    async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

#[async_trait]
impl<M: LanguageModel> LanguageModel for RateLimitedModel<M> {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        sampling: &SamplingConfig,
    ) -> Result<String> {
        self.wait_for_permit().await;
        self.inner.complete(system, user, sampling).await
    }
}

/// Extension trait for easy rate limiting.
pub trait ModelExt: LanguageModel + Sized {
    /// Wrap this model with rate limiting.
    fn rate_limited(self, requests_per_second: u32) -> RateLimitedModel<Self> {
        RateLimitedModel::new(self, requests_per_second)
    }
}

impl<M: LanguageModel + Sized> ModelExt for M {}
