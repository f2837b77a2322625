//! Application wiring.
//!
//! [`AppContext`] is built once at startup and shared as `Arc<AppContext>`
//! between the HTTP handlers and the polling scheduler. There is no global
//! instance; tests build their own with a manual clock and in-memory store.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::acquisition::{Acquired, AcquisitionService, ServiceSettings};
use crate::budget::BudgetStatus;
use crate::cache::CachedValue;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::create_pool;
use crate::error::AppError;
use crate::feed_health::FeedHealthMonitor;
use crate::metrics::AppMetrics;
use crate::services::events::{EventQuery, EventsProvider, EventsSnapshot};
use crate::services::fares::{FareProvider, FareQuery, FareSnapshot};
use crate::services::serpapi::SerpApiClient;
use crate::signals::{
    derive_event_alerts, derive_event_signals, derive_fare_alerts, Alert, EventImpactRules,
    EventSignal, FareDropThresholds,
};
use crate::storage::{KeyValueStore, MemoryStore, SqliteStore};
use crate::store::AlertInbox;

/// Upper bound on airports per high-impact events request.
pub const MAX_HIGH_IMPACT_AIRPORTS: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct BudgetOverview {
    pub fares: BudgetStatus,
    pub events: BudgetStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheOverview {
    pub fares: Vec<CachedValue<FareSnapshot>>,
    pub events: Vec<CachedValue<EventsSnapshot>>,
}

pub struct AppContext {
    pub clock: Arc<dyn Clock>,
    pub feed_health: Arc<FeedHealthMonitor>,
    pub metrics: Arc<AppMetrics>,
    pub fares: AcquisitionService<FareProvider>,
    pub events: AcquisitionService<EventsProvider>,
    pub alerts: RwLock<AlertInbox>,
    pub fare_drop: FareDropThresholds,
    pub event_rules: EventImpactRules,
}

impl AppContext {
    /// Production wiring: system clock and the configured storage.
    pub async fn init(config: &Config) -> Result<Self, AppError> {
        let store = open_store(&config.storage_url).await;
        Self::build(config, store, Arc::new(SystemClock)).await
    }

    /// Wire every component and load persisted budgets.
    pub async fn build(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        let metrics = Arc::new(
            AppMetrics::new().map_err(|err| AppError::Config(format!("metrics: {}", err)))?,
        );
        let feed_health = Arc::new(FeedHealthMonitor::new(config.freshness, clock.clone()));

        let client = SerpApiClient::new(
            config.serpapi_base_url.clone(),
            config.serpapi_key.clone(),
            std::time::Duration::from_secs(config.http_timeout_seconds),
        )?;
        if !client.has_api_key() {
            tracing::warn!("SERPAPI_KEY is not set; live fetches will fail and serve cached data only");
        }

        let fetch_timeout = seconds("HTTP_TIMEOUT_SECONDS", config.http_timeout_seconds)?;

        let fares = AcquisitionService::new(
            FareProvider::new(client.clone()),
            ServiceSettings::fares()
                .with_ttl(seconds("FARES_TTL_SECONDS", config.fares_ttl_seconds)?)
                .with_daily_limit(config.fares_daily_limit)
                .with_consume_policy(config.consume_policy)
                .with_fetch_timeout(fetch_timeout),
            store.clone(),
            clock.clone(),
            feed_health.clone(),
            metrics.clone(),
        );

        let events = AcquisitionService::new(
            EventsProvider::new(client),
            ServiceSettings::events()
                .with_ttl(seconds("EVENTS_TTL_SECONDS", config.events_ttl_seconds)?)
                .with_daily_limit(config.events_daily_limit)
                .with_consume_policy(config.consume_policy)
                .with_fetch_timeout(fetch_timeout),
            store,
            clock.clone(),
            feed_health.clone(),
            metrics.clone(),
        );

        let fares_budget = fares.init().await;
        let events_budget = events.init().await;
        tracing::info!(
            "Budgets loaded: fares {}/{}, events {}/{}",
            fares_budget.used,
            fares_budget.limit,
            events_budget.used,
            events_budget.limit,
        );

        Ok(Self {
            clock,
            feed_health,
            metrics,
            fares,
            events,
            alerts: RwLock::new(AlertInbox::default()),
            fare_drop: config.fare_drop,
            event_rules: EventImpactRules::default(),
        })
    }

    /// Acquire fares and, on a live fetch, raise fare-drop alerts against
    /// the payload it replaced.
    pub async fn acquire_fares(&self, query: &FareQuery, force_fresh: bool) -> Acquired<FareSnapshot> {
        let previous = self.fares.cached(query).await.map(|c| c.payload);
        let acquired = self.fares.acquire(query, force_fresh).await;

        if acquired.is_live() {
            let alerts = derive_fare_alerts(
                previous.as_ref(),
                &acquired.data,
                &self.fare_drop,
                self.clock.now(),
            );
            self.raise(alerts).await;
        }
        acquired
    }

    /// Acquire events and, on a live fetch, raise alerts for newly listed
    /// medium and high impact events.
    pub async fn acquire_events(
        &self,
        query: &EventQuery,
        force_fresh: bool,
    ) -> Acquired<EventsSnapshot> {
        let previous = self.events.cached(query).await.map(|c| c.payload);
        let acquired = self.events.acquire(query, force_fresh).await;

        if acquired.is_live() {
            let alerts = derive_event_alerts(
                previous.as_ref(),
                &acquired.data,
                &self.event_rules,
                self.clock.now(),
            );
            self.raise(alerts).await;
        }
        acquired
    }

    /// Medium and high impact events across `airports`, high first.
    /// Airports with no data contribute nothing.
    pub async fn high_impact_events(&self, airports: &[String]) -> Result<Vec<EventSignal>, AppError> {
        if airports.is_empty() {
            return Err(AppError::InvalidInput("At least one airport is required".into()));
        }
        if airports.len() > MAX_HIGH_IMPACT_AIRPORTS {
            return Err(AppError::InvalidInput(format!(
                "At most {} airports per request, got {}",
                MAX_HIGH_IMPACT_AIRPORTS,
                airports.len()
            )));
        }

        let queries = airports
            .iter()
            .map(|code| EventQuery::new(code))
            .collect::<Result<Vec<_>, _>>()?;

        let mut signals = Vec::new();
        for query in &queries {
            let acquired = self.acquire_events(query, false).await;
            signals.extend(derive_event_signals(&acquired.data, &self.event_rules));
        }

        signals.sort_by(|a, b| b.impact.cmp(&a.impact));
        Ok(signals)
    }

    pub async fn budget(&self) -> BudgetOverview {
        BudgetOverview {
            fares: self.fares.remaining_budget().await,
            events: self.events.remaining_budget().await,
        }
    }

    pub async fn cached_all(&self) -> CacheOverview {
        CacheOverview {
            fares: self.fares.get_cached_all().await,
            events: self.events.get_cached_all().await,
        }
    }

    pub async fn clear_caches(&self) {
        self.fares.clear_cache().await;
        self.events.clear_cache().await;
    }

    /// Pending alerts, oldest first. Each alert is returned once.
    pub async fn drain_alerts(&self) -> Vec<Alert> {
        self.alerts.write().await.drain()
    }

    async fn raise(&self, alerts: Vec<Alert>) {
        if alerts.is_empty() {
            return;
        }
        for alert in &alerts {
            self.metrics.record_alert(alert.severity);
            tracing::info!(
                severity = %alert.severity,
                subject = %alert.subject,
                "{}: {}",
                alert.title,
                alert.message
            );
        }
        self.alerts.write().await.push_all(alerts);
    }
}

fn seconds(name: &str, secs: u64) -> Result<Duration, AppError> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| AppError::Config(format!("{} is out of range: {}", name, secs)))
}

/// SQLite-backed storage, or process memory when the database cannot be
/// opened. Budgets then reset on restart.
pub async fn open_store(storage_url: &str) -> Arc<dyn KeyValueStore> {
    match create_pool(storage_url).await {
        Ok(pool) => Arc::new(SqliteStore::new(pool)),
        Err(err) => {
            tracing::warn!(
                "Could not open storage at {} ({}); budgets will not survive a restart",
                storage_url,
                err
            );
            Arc::new(MemoryStore::new())
        }
    }
}
