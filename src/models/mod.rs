//! Model decorators.

pub mod rate_limited;

pub use rate_limited::{ModelExt, RateLimitedModel};
