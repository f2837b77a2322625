//! Competitor fare drop policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Alert, AlertKind, Severity};
use crate::services::fares::FareSnapshot;

/// A drop of at least this many percent raises a warning.
pub const DEFAULT_WARNING_DROP_PCT: f64 = 20.0;
/// A drop of at least this many percent raises a critical alert.
pub const DEFAULT_CRITICAL_DROP_PCT: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareDropThresholds {
    pub warning_pct: f64,
    pub critical_pct: f64,
}

impl Default for FareDropThresholds {
    fn default() -> Self {
        Self {
            warning_pct: DEFAULT_WARNING_DROP_PCT,
            critical_pct: DEFAULT_CRITICAL_DROP_PCT,
        }
    }
}

/// Percent decrease from `previous` to `current`. Negative for increases,
/// `None` when there is no positive baseline.
pub fn fare_drop_pct(previous: f64, current: f64) -> Option<f64> {
    if !previous.is_finite() || previous <= 0.0 || !current.is_finite() {
        return None;
    }
    Some((previous - current) * 100.0 / previous)
}

/// Severity of a move from `previous` to `current`. Both boundaries are
/// inclusive.
///
/// Prices are compared in whole cents and thresholds in basis points, so an
/// exact 20% drop on `$100.50 -> $80.40` lands on the boundary instead of a
/// hair under it.
pub fn classify_fare_drop(
    previous: f64,
    current: f64,
    thresholds: &FareDropThresholds,
) -> Option<Severity> {
    let (prev_cents, cur_cents) = (to_cents(previous)?, to_cents(current)?);
    if prev_cents <= 0 {
        return None;
    }
    let drop_cents = i128::from(prev_cents) - i128::from(cur_cents);
    let meets = |pct: f64| {
        to_basis_points(pct)
            .is_some_and(|bp| drop_cents * 10_000 >= i128::from(bp) * i128::from(prev_cents))
    };

    if meets(thresholds.critical_pct) {
        Some(Severity::Critical)
    } else if meets(thresholds.warning_pct) {
        Some(Severity::Warning)
    } else {
        None
    }
}

const MAX_SCALED: f64 = 1e15;

fn to_cents(price: f64) -> Option<i64> {
    let cents = (price * 100.0).round();
    (cents.is_finite() && cents.abs() < MAX_SCALED).then_some(cents as i64)
}

fn to_basis_points(pct: f64) -> Option<i64> {
    let bp = (pct * 100.0).round();
    (bp.is_finite() && bp.abs() < MAX_SCALED).then_some(bp as i64)
}

/// Compare the cheapest fare against the previous observation for the same
/// route and date.
pub fn derive_fare_alerts(
    previous: Option<&FareSnapshot>,
    current: &FareSnapshot,
    thresholds: &FareDropThresholds,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let (Some(prev_min), Some(cur_min)) = (previous.and_then(|p| p.min_fare), current.min_fare)
    else {
        return Vec::new();
    };

    let Some(severity) = classify_fare_drop(prev_min, cur_min, thresholds) else {
        return Vec::new();
    };
    let drop_pct = fare_drop_pct(prev_min, cur_min).unwrap_or_default();

    let cheapest_airline = current
        .options
        .iter()
        .find(|o| o.price == cur_min)
        .map(|o| o.airline.as_str())
        .unwrap_or("a competitor");

    vec![Alert {
        kind: AlertKind::FareDrop,
        severity,
        title: format!("Fare drop on {}", current.route),
        message: format!(
            "{} now at ${:.0} on {}, down {:.0}% from ${:.0}",
            cheapest_airline, cur_min, current.date, drop_pct, prev_min
        ),
        subject: format!("{}-{}", current.route, current.date),
        raised_at: now,
    }]
}
