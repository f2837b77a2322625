//! Scripted provider for exercising the acquisition state machine.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::acquisition::normalize::{array, as_number, expect_object, string};
use crate::acquisition::provider::{FeedPayload, MeteredProvider, ProviderResult, RequestParams};
use crate::acquisition::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockQuery {
    key: String,
}

impl MockQuery {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl RequestParams for MockQuery {
    fn cache_key(&self) -> String {
        self.key.clone()
    }
}

/// Expects bodies shaped `{"label": "...", "records": [1, 2]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MockSnapshot {
    pub label: String,
    pub records: Vec<u32>,
}

impl FeedPayload for MockSnapshot {
    fn record_count(&self) -> usize {
        self.records.len()
    }
}

struct Scripted {
    reply: ProviderResult<Value>,
    delay: Option<Duration>,
}

/// Replies are handed out in order; the last one repeats forever.
#[derive(Default)]
pub struct MockProvider {
    replies: Mutex<VecDeque<Scripted>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, body: Value) -> Self {
        self.push(Ok(body), None)
    }

    pub fn then_response(self, body: Value) -> Self {
        self.push(Ok(body), None)
    }

    /// A reply that takes `delay` to arrive, overriding [`Self::with_delay`].
    pub fn then_delayed_response(self, body: Value, delay: Duration) -> Self {
        self.push(Ok(body), Some(delay))
    }

    pub fn with_error(self, err: ProviderError) -> Self {
        self.push(Err(err), None)
    }

    pub fn then_error(self, err: ProviderError) -> Self {
        self.push(Err(err), None)
    }

    /// Every fetch without its own delay sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches performed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn push(self, reply: ProviderResult<Value>, delay: Option<Duration>) -> Self {
        self.lock().push_back(Scripted { reply, delay });
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Scripted>> {
        self.replies.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_reply(&self) -> (ProviderResult<Value>, Option<Duration>) {
        let mut replies = self.lock();
        let next = if replies.len() > 1 {
            replies.pop_front().map(|s| (s.reply, s.delay))
        } else {
            replies.front().map(|s| (s.reply.clone(), s.delay))
        };
        match next {
            Some((reply, delay)) => (reply, delay.or(self.delay)),
            None => (Err(ProviderError::not_configured("no scripted reply")), self.delay),
        }
    }
}

#[async_trait]
impl MeteredProvider for MockProvider {
    type Params = MockQuery;
    type Payload = MockSnapshot;

    fn provider_name(&self) -> &str {
        "Mock"
    }

    async fn fetch(&self, _params: &MockQuery) -> ProviderResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (reply, delay) = self.next_reply();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        reply
    }

    fn normalize(&self, _params: &MockQuery, raw: Value) -> ProviderResult<MockSnapshot> {
        expect_object(&raw)?;
        let label = string(&raw, "label").ok_or_else(|| ProviderError::format("missing label"))?;
        let records = array(&raw, "records")
            .iter()
            .filter_map(as_number)
            .map(|n| n as u32)
            .collect();

        Ok(MockSnapshot { label, records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn replies_are_sequential_and_last_repeats() {
        let provider = MockProvider::new()
            .with_response(json!({ "label": "a" }))
            .then_error(ProviderError::Timeout);
        let q = MockQuery::new("k");

        assert!(provider.fetch(&q).await.is_ok());
        assert_eq!(provider.fetch(&q).await, Err(ProviderError::Timeout));
        assert_eq!(provider.fetch(&q).await, Err(ProviderError::Timeout));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn per_reply_delay_overrides_default() {
        let provider = MockProvider::new()
            .with_delay(Duration::from_secs(10))
            .then_delayed_response(json!({ "label": "quick" }), Duration::from_secs(1));
        let started = tokio::time::Instant::now();

        provider.fetch(&MockQuery::new("k")).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn empty_script_fails() {
        let provider = MockProvider::new();
        assert!(provider.fetch(&MockQuery::new("k")).await.is_err());
    }
}
