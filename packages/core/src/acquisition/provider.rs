//! Provider interface for metered upstreams.
//!
//! A provider knows how to call one upstream and how to turn its body into
//! a strict payload. Everything else (cache, budget, fallback) belongs to
//! the acquisition service.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::error::ProviderError;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Typed request parameters with a deterministic cache key.
pub trait RequestParams {
    fn cache_key(&self) -> String;
}

/// Canonical payload shape. `Default` is the structurally valid "no data"
/// value handed out when nothing can be served.
pub trait FeedPayload: Clone + Default + Serialize + Send + Sync + 'static {
    /// Number of records, reported to feed health.
    fn record_count(&self) -> usize;
}

#[async_trait]
pub trait MeteredProvider: Send + Sync {
    type Params: RequestParams + Send + Sync;
    type Payload: FeedPayload;

    /// Name of this provider for logging/debugging
    fn provider_name(&self) -> &str;

    /// Perform one network call and return the raw body.
    async fn fetch(&self, params: &Self::Params) -> ProviderResult<Value>;

    /// Validate and reshape a raw body. Malformed bodies are errors, just
    /// like network failures.
    fn normalize(&self, params: &Self::Params, raw: Value) -> ProviderResult<Self::Payload>;
}
