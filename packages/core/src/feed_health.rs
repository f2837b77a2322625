//! Per-feed freshness tracking for display.
//!
//! One [`FeedStatus`] per logical feed. Acquisition services update their
//! feed after every cycle; readers classify the status into a
//! [`FreshnessLevel`] against configurable [`FreshnessThresholds`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::clock::Clock;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedName {
    Fares,
    Flights,
    Bookings,
    Events,
}

impl FeedName {
    pub const ALL: [FeedName; 4] = [
        FeedName::Fares,
        FeedName::Flights,
        FeedName::Bookings,
        FeedName::Events,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedName::Fares => "fares",
            FeedName::Flights => "flights",
            FeedName::Bookings => "bookings",
            FeedName::Events => "events",
        }
    }
}

impl fmt::Display for FeedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedName {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fares" => Ok(FeedName::Fares),
            "flights" => Ok(FeedName::Flights),
            "bookings" => Ok(FeedName::Bookings),
            "events" => Ok(FeedName::Events),
            other => Err(AppError::InvalidInput(format!("Unknown feed '{}'", other))),
        }
    }
}

/// Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreshnessLevel {
    Live,
    Aging,
    Stale,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessThresholds {
    /// Age below which a feed is `live`.
    pub live_secs: i64,
    /// Age above which a feed is `stale`.
    pub aging_secs: i64,
}

impl Default for FreshnessThresholds {
    fn default() -> Self {
        Self {
            live_secs: 30,
            aging_secs: 120,
        }
    }
}

/// Classify data age. Total over every input: no timestamp is `disconnected`.
pub fn classify(
    last_update: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    thresholds: &FreshnessThresholds,
) -> FreshnessLevel {
    let Some(last_update) = last_update else {
        return FreshnessLevel::Disconnected;
    };

    // A timestamp ahead of `now` (clock skew) counts as age zero.
    let age = (now - last_update).max(Duration::zero());

    // Thresholds too large for a Duration never expire.
    let limit = |secs: i64| Duration::try_seconds(secs);

    if limit(thresholds.live_secs).map_or(true, |live| age < live) {
        FreshnessLevel::Live
    } else if limit(thresholds.aging_secs).map_or(true, |aging| age <= aging) {
        FreshnessLevel::Aging
    } else {
        FreshnessLevel::Stale
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedStatus {
    pub feed: FeedName,
    pub last_update: Option<DateTime<Utc>>,
    pub is_connected: bool,
    pub record_count: usize,
    pub error: Option<String>,
}

impl FeedStatus {
    pub fn new(feed: FeedName) -> Self {
        Self {
            feed,
            last_update: None,
            is_connected: false,
            record_count: 0,
            error: None,
        }
    }

    pub fn freshness(&self, now: DateTime<Utc>, thresholds: &FreshnessThresholds) -> FreshnessLevel {
        if !self.is_connected {
            return FreshnessLevel::Disconnected;
        }
        classify(self.last_update, now, thresholds)
    }
}

/// Status plus its classification, as served to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct FeedHealthReport {
    #[serde(flatten)]
    pub status: FeedStatus,
    pub level: FreshnessLevel,
}

pub struct FeedHealthMonitor {
    statuses: RwLock<HashMap<FeedName, FeedStatus>>,
    thresholds: FreshnessThresholds,
    clock: Arc<dyn Clock>,
}

impl FeedHealthMonitor {
    pub fn new(thresholds: FreshnessThresholds, clock: Arc<dyn Clock>) -> Self {
        let statuses = FeedName::ALL
            .iter()
            .map(|feed| (*feed, FeedStatus::new(*feed)))
            .collect();

        Self {
            statuses: RwLock::new(statuses),
            thresholds,
            clock,
        }
    }

    /// Mark `feed` as freshly updated and connected.
    pub async fn record_update(&self, feed: FeedName, record_count: usize) {
        let now = self.clock.now();
        let mut statuses = self.statuses.write().await;
        let status = statuses.entry(feed).or_insert_with(|| FeedStatus::new(feed));
        status.last_update = Some(now);
        status.is_connected = true;
        status.record_count = record_count;
        status.error = None;
    }

    /// Mark `feed` as disconnected, keeping its last good timestamp.
    pub async fn record_disconnect(&self, feed: FeedName, error: impl Into<String>) {
        let mut statuses = self.statuses.write().await;
        let status = statuses.entry(feed).or_insert_with(|| FeedStatus::new(feed));
        status.is_connected = false;
        status.error = Some(error.into());
    }

    /// Note a problem that did not cost the feed its data.
    pub async fn record_error(&self, feed: FeedName, error: impl Into<String>) {
        let mut statuses = self.statuses.write().await;
        let status = statuses.entry(feed).or_insert_with(|| FeedStatus::new(feed));
        status.error = Some(error.into());
    }

    pub async fn get_status(&self, feed: FeedName) -> FeedStatus {
        self.statuses
            .read()
            .await
            .get(&feed)
            .cloned()
            .unwrap_or_else(|| FeedStatus::new(feed))
    }

    pub async fn level(&self, feed: FeedName) -> FreshnessLevel {
        self.get_status(feed)
            .await
            .freshness(self.clock.now(), &self.thresholds)
    }

    /// Every feed with its classification, in [`FeedName`] order.
    pub async fn report(&self) -> Vec<FeedHealthReport> {
        let now = self.clock.now();
        let statuses = self.statuses.read().await;
        let mut reports: Vec<_> = statuses
            .values()
            .map(|status| FeedHealthReport {
                level: status.freshness(now, &self.thresholds),
                status: status.clone(),
            })
            .collect();
        reports.sort_by_key(|r| r.status.feed);
        reports
    }

    pub fn thresholds(&self) -> &FreshnessThresholds {
        &self.thresholds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 4, 10, 0, 0).unwrap()
    }

    fn level_at(seconds_ago: i64) -> FreshnessLevel {
        classify(
            Some(now() - Duration::seconds(seconds_ago)),
            now(),
            &FreshnessThresholds::default(),
        )
    }

    #[test]
    fn classification_boundaries() {
        assert_eq!(level_at(29), FreshnessLevel::Live);
        assert_eq!(level_at(30), FreshnessLevel::Aging);
        assert_eq!(level_at(31), FreshnessLevel::Aging);
        assert_eq!(level_at(120), FreshnessLevel::Aging);
        assert_eq!(level_at(121), FreshnessLevel::Stale);
    }

    #[test]
    fn absent_timestamp_is_disconnected() {
        assert_eq!(
            classify(None, now(), &FreshnessThresholds::default()),
            FreshnessLevel::Disconnected
        );
    }

    #[test]
    fn future_timestamp_is_live() {
        assert_eq!(level_at(-10), FreshnessLevel::Live);
    }

    #[test]
    fn thresholds_are_configurable() {
        let tight = FreshnessThresholds {
            live_secs: 5,
            aging_secs: 10,
        };
        let last = Some(now() - Duration::seconds(11));
        assert_eq!(classify(last, now(), &tight), FreshnessLevel::Stale);
    }

    #[test]
    fn unrepresentable_thresholds_never_expire() {
        let huge = FreshnessThresholds {
            live_secs: 10,
            aging_secs: i64::MAX,
        };
        let last = Some(now() - Duration::days(3650));
        assert_eq!(classify(last, now(), &huge), FreshnessLevel::Aging);
    }

    #[test]
    fn disconnected_status_ignores_timestamp() {
        let status = FeedStatus {
            feed: FeedName::Fares,
            last_update: Some(now()),
            is_connected: false,
            record_count: 3,
            error: Some("timeout".into()),
        };
        assert_eq!(
            status.freshness(now(), &FreshnessThresholds::default()),
            FreshnessLevel::Disconnected
        );
    }

    #[test]
    fn feed_name_parses_case_insensitively() {
        assert_eq!("Events".parse::<FeedName>().unwrap(), FeedName::Events);
        assert!("weather".parse::<FeedName>().is_err());
    }

    #[tokio::test]
    async fn monitor_starts_every_feed_disconnected() {
        let monitor = FeedHealthMonitor::new(
            FreshnessThresholds::default(),
            Arc::new(ManualClock::new(now())),
        );
        let report = monitor.report().await;

        assert_eq!(report.len(), 4);
        assert_eq!(report[0].status.feed, FeedName::Fares);
        assert!(report.iter().all(|r| r.level == FreshnessLevel::Disconnected));
    }

    #[tokio::test]
    async fn record_update_then_age_through_levels() {
        let clock = Arc::new(ManualClock::new(now()));
        let monitor = FeedHealthMonitor::new(FreshnessThresholds::default(), clock.clone());

        monitor.record_update(FeedName::Fares, 12).await;
        assert_eq!(monitor.level(FeedName::Fares).await, FreshnessLevel::Live);
        assert_eq!(monitor.get_status(FeedName::Fares).await.record_count, 12);

        clock.advance(Duration::seconds(31));
        assert_eq!(monitor.level(FeedName::Fares).await, FreshnessLevel::Aging);

        clock.advance(Duration::seconds(90));
        assert_eq!(monitor.level(FeedName::Fares).await, FreshnessLevel::Stale);
    }

    #[tokio::test]
    async fn disconnect_keeps_last_update_and_sets_error() {
        let clock = Arc::new(ManualClock::new(now()));
        let monitor = FeedHealthMonitor::new(FreshnessThresholds::default(), clock);
        monitor.record_update(FeedName::Events, 4).await;
        monitor.record_disconnect(FeedName::Events, "HTTP 503").await;

        let status = monitor.get_status(FeedName::Events).await;
        assert!(!status.is_connected);
        assert_eq!(status.last_update, Some(now()));
        assert_eq!(status.error.as_deref(), Some("HTTP 503"));
        assert_eq!(monitor.level(FeedName::Events).await, FreshnessLevel::Disconnected);
    }

    #[tokio::test]
    async fn record_error_keeps_connection() {
        let clock = Arc::new(ManualClock::new(now()));
        let monitor = FeedHealthMonitor::new(FreshnessThresholds::default(), clock);
        monitor.record_update(FeedName::Fares, 1).await;
        monitor.record_error(FeedName::Fares, "served stale").await;

        let status = monitor.get_status(FeedName::Fares).await;
        assert!(status.is_connected);
        assert_eq!(status.error.as_deref(), Some("served stale"));
    }

    proptest! {
        #[test]
        fn classification_is_monotonic_in_age(a in 0i64..1_000, b in 0i64..1_000) {
            let (younger, older) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(level_at(younger) <= level_at(older));
        }
    }
}
