//! Result shapes returned by acquisition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::budget::BudgetStatus;

/// Terminal state of one `acquire` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionOutcome {
    /// Fresh cache entry, no budget spent.
    FreshHit,
    /// Budget exhausted, served whatever the cache held.
    StaleHitNoBudget,
    /// Fetch failed, served whatever the cache held.
    StaleHitAfterFailure,
    LiveFetchSuccess,
    /// Nothing to serve. Payload is the empty default.
    Unavailable,
}

impl AcquisitionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionOutcome::FreshHit => "fresh_hit",
            AcquisitionOutcome::StaleHitNoBudget => "stale_hit_no_budget",
            AcquisitionOutcome::StaleHitAfterFailure => "stale_hit_after_failure",
            AcquisitionOutcome::LiveFetchSuccess => "live_fetch_success",
            AcquisitionOutcome::Unavailable => "unavailable",
        }
    }
}

/// When a call is charged against the daily budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumePolicy {
    /// Charge only fetches that succeeded and normalized.
    #[default]
    OnSuccess,
    /// Charge every initiated fetch, failed or not.
    OnAttempt,
}

/// What consumers receive. Always renderable: degraded cases carry flags,
/// never a different shape.
#[derive(Debug, Clone, Serialize)]
pub struct Acquired<T> {
    pub key: String,
    pub data: T,
    pub outcome: AcquisitionOutcome,
    pub is_stale: bool,
    /// `false` only for [`AcquisitionOutcome::Unavailable`].
    pub available: bool,
    pub captured_at: Option<DateTime<Utc>>,
    pub budget: BudgetStatus,
    /// Why the result is degraded, when it is.
    pub error: Option<String>,
}

impl<T> Acquired<T> {
    pub fn is_live(&self) -> bool {
        self.outcome == AcquisitionOutcome::LiveFetchSuccess
    }
}
