//! Watch-list polling scheduler.
//!
//! Keeps the configured routes and airports warm: each tick acquires every
//! watched key through [`AppContext`], which spends budget only when the
//! cached entry has gone stale and raises alerts on live fetches.

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::time;

use crate::acquisition::AcquisitionOutcome;
use crate::config::WatchList;
use crate::context::AppContext;

/// Outcome tally for one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollSummary {
    pub live: usize,
    pub cached: usize,
    pub unavailable: usize,
}

/// Run the polling loop.
///
/// A degraded acquisition for one key is logged and the loop moves on to
/// the next; nothing here can take the scheduler down.
///
/// Runs until `Ctrl+C` (SIGINT) is received.
pub async fn run_acquisition_polling(
    context: Arc<AppContext>,
    watch: WatchList,
    poll_interval_seconds: u64,
) {
    if watch.is_empty() {
        tracing::info!("Watch list is empty, polling disabled");
        return;
    }

    let mut interval = time::interval(Duration::from_secs(poll_interval_seconds));

    tracing::info!(
        routes = watch.routes.len(),
        airports = watch.airports.len(),
        "Acquisition polling started (interval: {}s)",
        poll_interval_seconds
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                poll_once(&context, &watch).await;
            }

            _ = signal::ctrl_c() => {
                tracing::info!("Shutdown signal received. Stopping polling.");
                break;
            }
        }
    }

    tracing::info!("Acquisition polling stopped cleanly");
}

/// Execute a single poll cycle. Extracted for testability.
pub async fn poll_once(context: &AppContext, watch: &WatchList) -> PollSummary {
    let mut summary = PollSummary::default();

    for route in &watch.routes {
        let acquired = context.acquire_fares(route, false).await;
        tally(&mut summary, acquired.outcome);
    }

    for airport in &watch.airports {
        let acquired = context.acquire_events(airport, false).await;
        tally(&mut summary, acquired.outcome);
    }

    tracing::info!(
        live = summary.live,
        cached = summary.cached,
        unavailable = summary.unavailable,
        "Poll cycle complete",
    );
    summary
}

fn tally(summary: &mut PollSummary, outcome: AcquisitionOutcome) {
    match outcome {
        AcquisitionOutcome::LiveFetchSuccess => summary.live += 1,
        AcquisitionOutcome::Unavailable => summary.unavailable += 1,
        AcquisitionOutcome::FreshHit
        | AcquisitionOutcome::StaleHitNoBudget
        | AcquisitionOutcome::StaleHitAfterFailure => summary.cached += 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::clock::ManualClock;
    use crate::config::Config;
    use crate::services::events::EventQuery;
    use crate::services::fares::FareQuery;
    use crate::storage::MemoryStore;

    async fn make_context(server: &MockServer, fares_daily_limit: u32) -> AppContext {
        let mut config = Config::from_lookup(|_| None).unwrap();
        config.serpapi_base_url = server.uri();
        config.serpapi_key = "test-key".into();
        config.fares_daily_limit = fares_daily_limit;

        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap(),
        ));
        AppContext::build(&config, Arc::new(MemoryStore::new()), clock)
            .await
            .unwrap()
    }

    fn watch() -> WatchList {
        WatchList {
            routes: vec![
                FareQuery::new("MIA", "JFK", "2026-11-01").unwrap(),
                FareQuery::new("MIA", "BOS", "2026-11-01").unwrap(),
            ],
            airports: vec![EventQuery::new("MIA").unwrap()],
        }
    }

    async fn mount_ok(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("engine", "google_flights"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "best_flights": [{ "price": 150, "flights": [{ "airline": "Delta" }] }]
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("engine", "google_events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "events_results": [{ "title": "Jazz Concert" }]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn first_cycle_fetches_every_watched_key() {
        let server = MockServer::start().await;
        mount_ok(&server).await;
        let ctx = make_context(&server, 500).await;

        let summary = poll_once(&ctx, &watch()).await;

        assert_eq!(summary, PollSummary { live: 3, cached: 0, unavailable: 0 });
        assert_eq!(ctx.budget().await.fares.used, 2);
        assert_eq!(ctx.budget().await.events.used, 1);
    }

    #[tokio::test]
    async fn second_cycle_within_ttl_spends_nothing() {
        let server = MockServer::start().await;
        mount_ok(&server).await;
        let ctx = make_context(&server, 500).await;

        poll_once(&ctx, &watch()).await;
        let summary = poll_once(&ctx, &watch()).await;

        assert_eq!(summary, PollSummary { live: 0, cached: 3, unavailable: 0 });
        assert_eq!(ctx.budget().await.fares.used, 2);
    }

    #[tokio::test]
    async fn exhausted_budget_degrades_without_stopping_the_cycle() {
        let server = MockServer::start().await;
        mount_ok(&server).await;
        let ctx = make_context(&server, 1).await;

        let summary = poll_once(&ctx, &watch()).await;

        assert_eq!(summary, PollSummary { live: 2, cached: 0, unavailable: 1 });
    }

    #[tokio::test]
    async fn provider_outage_is_counted_as_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let ctx = make_context(&server, 500).await;

        let summary = poll_once(&ctx, &watch()).await;

        assert_eq!(summary.unavailable, 3);
        assert_eq!(ctx.budget().await.fares.used, 0);
    }

    #[tokio::test]
    async fn empty_watch_list_returns_immediately() {
        let server = MockServer::start().await;
        let ctx = Arc::new(make_context(&server, 500).await);
        run_acquisition_polling(ctx, WatchList::default(), 1).await;
    }
}
