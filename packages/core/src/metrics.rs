//! Prometheus metrics registry for the feed acquisition layer.
//!
//! [`AppMetrics`] owns all registered metrics and the [`Registry`] they
//! belong to. Construct it once at startup, wrap in `Arc`, and pass it
//! to the acquisition services and HTTP middleware.
//!
//! Exposed at `GET /metrics` in Prometheus text exposition format
//! (`text/plain; version=0.0.4`).

use prometheus::{
    CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
};

use crate::acquisition::AcquisitionOutcome;
use crate::feed_health::FeedName;
use crate::signals::Severity;

/// All application-level Prometheus metrics.
pub struct AppMetrics {
    /// Acquisition calls, labelled by feed and outcome.
    pub acquisitions_total: CounterVec,
    /// Provider fetches that failed or timed out, labelled by feed.
    pub provider_failures_total: CounterVec,
    /// Calls charged against today's budget, labelled by feed.
    pub budget_calls_used: GaugeVec,
    /// Entries held in each feed's freshness cache.
    pub cache_entries: GaugeVec,
    /// Alerts raised by signal derivation, labelled by severity.
    pub alerts_raised_total: CounterVec,
    /// HTTP request count, labelled by method, path, and status code.
    pub http_requests_total: CounterVec,
    /// HTTP request latency histogram in seconds, labelled by path.
    pub http_request_duration: HistogramVec,
    /// The registry that owns all of the above metrics.
    pub registry: Registry,
}

impl AppMetrics {
    /// Create and register all metrics. Returns an error if any metric
    /// name is invalid or duplicated.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let acquisitions_total = CounterVec::new(
            Opts::new(
                "skyweave_feeds_acquisitions_total",
                "Acquisition calls by feed and outcome",
            ),
            &["feed", "outcome"],
        )?;

        let provider_failures_total = CounterVec::new(
            Opts::new(
                "skyweave_feeds_provider_failures_total",
                "Failed or timed-out provider fetches",
            ),
            &["feed"],
        )?;

        let budget_calls_used = GaugeVec::new(
            Opts::new(
                "skyweave_feeds_budget_calls_used",
                "Calls charged against the current daily budget",
            ),
            &["feed"],
        )?;

        let cache_entries = GaugeVec::new(
            Opts::new(
                "skyweave_feeds_cache_entries",
                "Entries held in the freshness cache",
            ),
            &["feed"],
        )?;

        let alerts_raised_total = CounterVec::new(
            Opts::new(
                "skyweave_feeds_alerts_raised_total",
                "Alerts raised by signal derivation",
            ),
            &["severity"],
        )?;

        let http_requests_total = CounterVec::new(
            Opts::new(
                "skyweave_feeds_http_requests_total",
                "HTTP requests by method, path, and status",
            ),
            &["method", "path", "status"],
        )?;

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "skyweave_feeds_http_request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 30.0]),
            &["path"],
        )?;

        registry.register(Box::new(acquisitions_total.clone()))?;
        registry.register(Box::new(provider_failures_total.clone()))?;
        registry.register(Box::new(budget_calls_used.clone()))?;
        registry.register(Box::new(cache_entries.clone()))?;
        registry.register(Box::new(alerts_raised_total.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;

        Ok(Self {
            acquisitions_total,
            provider_failures_total,
            budget_calls_used,
            cache_entries,
            alerts_raised_total,
            http_requests_total,
            http_request_duration,
            registry,
        })
    }

    pub fn record_acquisition(&self, feed: FeedName, outcome: AcquisitionOutcome) {
        self.acquisitions_total
            .with_label_values(&[feed.as_str(), outcome.as_str()])
            .inc();
    }

    pub fn record_provider_failure(&self, feed: FeedName) {
        self.provider_failures_total
            .with_label_values(&[feed.as_str()])
            .inc();
    }

    pub fn set_budget_used(&self, feed: FeedName, used: u32) {
        self.budget_calls_used
            .with_label_values(&[feed.as_str()])
            .set(f64::from(used));
    }

    pub fn set_cache_entries(&self, feed: FeedName, entries: usize) {
        self.cache_entries
            .with_label_values(&[feed.as_str()])
            .set(entries as f64);
    }

    pub fn record_alert(&self, severity: Severity) {
        self.alerts_raised_total
            .with_label_values(&[severity.as_str()])
            .inc();
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, seconds: f64) {
        self.http_requests_total
            .with_label_values(&[method, path, &status.to_string()])
            .inc();
        self.http_request_duration
            .with_label_values(&[path])
            .observe(seconds);
    }

    /// Render all metrics as Prometheus text format (for the `/metrics` endpoint).
    pub fn render(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_metrics_register_without_error() {
        let metrics = AppMetrics::new();
        assert!(metrics.is_ok(), "AppMetrics::new() failed: {:?}", metrics.err());
    }

    #[test]
    fn acquisition_counter_is_labelled_by_feed_and_outcome() {
        let metrics = AppMetrics::new().unwrap();
        metrics.record_acquisition(FeedName::Fares, AcquisitionOutcome::FreshHit);
        metrics.record_acquisition(FeedName::Fares, AcquisitionOutcome::FreshHit);
        metrics.record_acquisition(FeedName::Events, AcquisitionOutcome::Unavailable);

        let fares = metrics
            .acquisitions_total
            .with_label_values(&["fares", "fresh_hit"])
            .get();
        assert!((fares - 2.0).abs() < f64::EPSILON);

        let output = metrics.render().unwrap();
        assert!(output.contains("skyweave_feeds_acquisitions_total"));
        assert!(output.contains("outcome=\"unavailable\""));
    }

    #[test]
    fn gauges_overwrite_previous_value() {
        let metrics = AppMetrics::new().unwrap();
        metrics.set_budget_used(FeedName::Events, 7);
        metrics.set_budget_used(FeedName::Events, 0);
        metrics.set_cache_entries(FeedName::Fares, 42);

        let used = metrics.budget_calls_used.with_label_values(&["events"]).get();
        let cached = metrics.cache_entries.with_label_values(&["fares"]).get();
        assert!(used.abs() < f64::EPSILON);
        assert!((cached - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn alerts_and_failures_are_counted() {
        let metrics = AppMetrics::new().unwrap();
        metrics.record_alert(Severity::Critical);
        metrics.record_provider_failure(FeedName::Fares);

        let output = metrics.render().unwrap();
        assert!(output.contains("skyweave_feeds_alerts_raised_total{severity=\"critical\"} 1"));
        assert!(output.contains("skyweave_feeds_provider_failures_total{feed=\"fares\"} 1"));
    }

    #[test]
    fn http_requests_counter_vec_labels_work() {
        let metrics = AppMetrics::new().unwrap();
        metrics.record_http_request("GET", "/fares", 200, 0.042);
        let val = metrics
            .http_requests_total
            .with_label_values(&["GET", "/fares", "200"])
            .get();
        assert!((val - 1.0).abs() < f64::EPSILON);
    }
}
