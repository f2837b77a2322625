//! Generic acquisition state machine.
//!
//! `acquire` runs cache lookup, budget check, fetch, normalize, cache write
//! and stale fallback, ending in exactly one [`AcquisitionOutcome`]. There
//! are no retries inside a call; the next poll is the retry.
//!
//! Requests for the same key are not coalesced. Two overlapping calls can
//! both miss the cache and both fetch; whichever finishes last owns the
//! cache entry. The cache lock is never held across the network call.

use std::sync::Arc;

use chrono::Duration;
use tokio::sync::RwLock;

use super::error::ProviderError;
use super::provider::{FeedPayload, MeteredProvider, RequestParams};
use super::types::{Acquired, AcquisitionOutcome, ConsumePolicy};
use crate::budget::{BudgetLedger, BudgetStatus};
use crate::cache::{CachedValue, FreshnessCache};
use crate::clock::Clock;
use crate::feed_health::{FeedHealthMonitor, FeedName};
use crate::metrics::AppMetrics;
use crate::storage::KeyValueStore;

pub const FARES_BUDGET_KEY: &str = "skyweave.budget.fares";
pub const EVENTS_BUDGET_KEY: &str = "skyweave.budget.events";

pub const FARES_DAILY_LIMIT: u32 = 500;
pub const EVENTS_DAILY_LIMIT: u32 = 100;

pub const FARES_TTL_MINUTES: i64 = 15;
pub const EVENTS_TTL_MINUTES: i64 = 60;

pub const DEFAULT_FETCH_TIMEOUT_SECS: i64 = 30;

const BUDGET_EXHAUSTED: &str = "daily call budget exhausted";

/// Per-provider knobs of the state machine.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub feed: FeedName,
    pub ttl: Duration,
    pub daily_limit: u32,
    pub storage_key: String,
    pub consume_policy: ConsumePolicy,
    pub fetch_timeout: Duration,
}

impl ServiceSettings {
    pub fn fares() -> Self {
        Self {
            feed: FeedName::Fares,
            ttl: Duration::minutes(FARES_TTL_MINUTES),
            daily_limit: FARES_DAILY_LIMIT,
            storage_key: FARES_BUDGET_KEY.to_string(),
            consume_policy: ConsumePolicy::default(),
            fetch_timeout: Duration::seconds(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }

    pub fn events() -> Self {
        Self {
            feed: FeedName::Events,
            ttl: Duration::minutes(EVENTS_TTL_MINUTES),
            daily_limit: EVENTS_DAILY_LIMIT,
            storage_key: EVENTS_BUDGET_KEY.to_string(),
            consume_policy: ConsumePolicy::default(),
            fetch_timeout: Duration::seconds(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_daily_limit(mut self, daily_limit: u32) -> Self {
        self.daily_limit = daily_limit;
        self
    }

    pub fn with_consume_policy(mut self, consume_policy: ConsumePolicy) -> Self {
        self.consume_policy = consume_policy;
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }
}

pub struct AcquisitionService<P: MeteredProvider> {
    provider: P,
    settings: ServiceSettings,
    ledger: BudgetLedger,
    cache: RwLock<FreshnessCache<P::Payload>>,
    clock: Arc<dyn Clock>,
    feed_health: Arc<FeedHealthMonitor>,
    metrics: Arc<AppMetrics>,
}

impl<P: MeteredProvider> AcquisitionService<P> {
    pub fn new(
        provider: P,
        settings: ServiceSettings,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        feed_health: Arc<FeedHealthMonitor>,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        let ledger = BudgetLedger::new(
            settings.storage_key.clone(),
            settings.daily_limit,
            store,
            clock.clone(),
        );
        let cache = RwLock::new(FreshnessCache::new(settings.ttl, clock.clone()));

        Self {
            provider,
            settings,
            ledger,
            cache,
            clock,
            feed_health,
            metrics,
        }
    }

    /// Load the persisted budget. Call once before serving.
    pub async fn init(&self) -> BudgetStatus {
        let status = self.ledger.load().await;
        self.metrics.set_budget_used(self.settings.feed, status.used);
        status
    }

    /// Obtain data for `params`. Never fails: degraded outcomes come back
    /// as flagged results with the same shape as a live one.
    pub async fn acquire(&self, params: &P::Params, force_fresh: bool) -> Acquired<P::Payload> {
        let key = params.cache_key();
        let feed = self.settings.feed;

        if !force_fresh {
            let cached = self.cache.read().await.get(&key);
            if let Some(hit) = cached.filter(|hit| !hit.is_stale) {
                tracing::debug!(feed = %feed, key = %key, "Fresh cache hit");
                return self
                    .serve_cached(key, hit, AcquisitionOutcome::FreshHit, None)
                    .await;
            }
        }

        if !self.ledger.has_budget().await {
            let cached = self.cache.read().await.get(&key);
            return match cached {
                Some(hit) => {
                    tracing::warn!(feed = %feed, key = %key, "Budget exhausted, serving cached data");
                    self.serve_cached(
                        key,
                        hit,
                        AcquisitionOutcome::StaleHitNoBudget,
                        Some(BUDGET_EXHAUSTED.to_string()),
                    )
                    .await
                }
                None => {
                    tracing::warn!(feed = %feed, key = %key, "Budget exhausted and nothing cached");
                    self.feed_health.record_error(feed, BUDGET_EXHAUSTED).await;
                    self.unavailable(key, BUDGET_EXHAUSTED.to_string()).await
                }
            };
        }

        if self.settings.consume_policy == ConsumePolicy::OnAttempt {
            self.ledger.consume().await;
        }

        match self.fetch_normalized(params).await {
            Ok(payload) => {
                let record_count = payload.record_count();
                let captured_at = self.clock.now();
                self.cache.write().await.put(key.clone(), payload.clone());

                if self.settings.consume_policy == ConsumePolicy::OnSuccess {
                    self.ledger.consume().await;
                }
                self.feed_health.record_update(feed, record_count).await;

                let acquired = self
                    .finish(
                        key,
                        payload,
                        AcquisitionOutcome::LiveFetchSuccess,
                        Some(captured_at),
                        None,
                    )
                    .await;
                tracing::info!(
                    feed = %feed,
                    key = %acquired.key,
                    records = record_count,
                    "Live fetch from {} ({}/{} calls used)",
                    self.provider.provider_name(),
                    acquired.budget.used,
                    acquired.budget.limit,
                );
                acquired
            }
            Err(err) => {
                self.metrics.record_provider_failure(feed);
                let cached = self.cache.read().await.get(&key);
                match cached {
                    Some(hit) => {
                        tracing::warn!(
                            feed = %feed,
                            key = %key,
                            "{} fetch failed, serving cached data: {}",
                            self.provider.provider_name(),
                            err
                        );
                        self.feed_health.record_error(feed, err.to_string()).await;
                        self.serve_cached(
                            key,
                            hit,
                            AcquisitionOutcome::StaleHitAfterFailure,
                            Some(err.to_string()),
                        )
                        .await
                    }
                    None => {
                        tracing::error!(
                            feed = %feed,
                            key = %key,
                            "{} fetch failed with nothing cached: {}",
                            self.provider.provider_name(),
                            err
                        );
                        self.feed_health.record_disconnect(feed, err.to_string()).await;
                        self.unavailable(key, err.to_string()).await
                    }
                }
            }
        }
    }

    /// Current cache entry for `params`, if any. Does not touch the network
    /// or the budget.
    pub async fn cached(&self, params: &P::Params) -> Option<CachedValue<P::Payload>> {
        self.cache.read().await.get(&params.cache_key())
    }

    pub async fn has_budget(&self) -> bool {
        self.ledger.has_budget().await
    }

    pub async fn remaining_budget(&self) -> BudgetStatus {
        self.ledger.remaining().await
    }

    pub async fn get_cached_all(&self) -> Vec<CachedValue<P::Payload>> {
        self.cache.read().await.all()
    }

    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
        self.metrics.set_cache_entries(self.settings.feed, 0);
        tracing::info!(feed = %self.settings.feed, "Cache cleared");
    }

    pub fn feed(&self) -> FeedName {
        self.settings.feed
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    async fn fetch_normalized(&self, params: &P::Params) -> Result<P::Payload, ProviderError> {
        let timeout = self
            .settings
            .fetch_timeout
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS as u64));

        let raw = tokio::time::timeout(timeout, self.provider.fetch(params))
            .await
            .map_err(|_| ProviderError::Timeout)??;

        self.provider.normalize(params, raw)
    }

    async fn serve_cached(
        &self,
        key: String,
        hit: CachedValue<P::Payload>,
        outcome: AcquisitionOutcome,
        error: Option<String>,
    ) -> Acquired<P::Payload> {
        let mut acquired = self
            .finish(key, hit.payload, outcome, Some(hit.captured_at), error)
            .await;
        // Anything served as a fallback is flagged stale, even if its TTL
        // has not run out (e.g. a forced refresh that failed).
        acquired.is_stale = outcome != AcquisitionOutcome::FreshHit;
        acquired
    }

    async fn unavailable(&self, key: String, error: String) -> Acquired<P::Payload> {
        let mut acquired = self
            .finish(
                key,
                P::Payload::default(),
                AcquisitionOutcome::Unavailable,
                None,
                Some(error),
            )
            .await;
        acquired.available = false;
        acquired
    }

    async fn finish(
        &self,
        key: String,
        data: P::Payload,
        outcome: AcquisitionOutcome,
        captured_at: Option<chrono::DateTime<chrono::Utc>>,
        error: Option<String>,
    ) -> Acquired<P::Payload> {
        let budget = self.ledger.remaining().await;
        let feed = self.settings.feed;

        self.metrics.record_acquisition(feed, outcome);
        self.metrics.set_budget_used(feed, budget.used);
        self.metrics
            .set_cache_entries(feed, self.cache.read().await.len());

        Acquired {
            key,
            data,
            outcome,
            is_stale: false,
            available: true,
            captured_at,
            budget,
            error,
        }
    }
}
