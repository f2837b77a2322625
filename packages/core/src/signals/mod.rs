//! Alert derivation from freshly acquired payloads.
//!
//! Everything here is pure: callers pass the current payload (and, for
//! fares, the previous one) and get zero or more [`Alert`]s back. The
//! thresholds are plain data so operators can override them.

pub mod event_impact;
pub mod fare_drop;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use event_impact::{
    classify_event_impact, derive_event_alerts, derive_event_signals, DemandImpact, EventImpactRules,
    EventSignal,
};
pub use fare_drop::{classify_fare_drop, derive_fare_alerts, fare_drop_pct, FareDropThresholds};

/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    FareDrop,
    EventImpact,
}

/// One alert for the UI. Not cached; consumed once from the inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    /// Cache key of the payload that raised it, e.g. `MIA-JFK-2026-11-01`.
    pub subject: String,
    pub raised_at: DateTime<Utc>,
}
