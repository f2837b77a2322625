//! JSON HTTP surface over [`AppContext`].
//!
//! Degraded data (stale, budget exhausted, provider down) is still a 200
//! with flags in the body. Only malformed arguments produce 4xx.

pub mod alerts;
pub mod events;
pub mod fares;
pub mod feeds;
pub mod health;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::context::AppContext;
use crate::metrics::AppMetrics;

/// Shared state for every route.
pub type ApiState = Arc<AppContext>;

/// Assemble the full application router.
pub fn create_router(context: ApiState) -> Router {
    let metrics = context.metrics.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .merge(fares::create_fares_router())
        .merge(events::create_events_router())
        .merge(feeds::create_feeds_router())
        .merge(alerts::create_alerts_router())
        .with_state(context)
        .route_layer(middleware::from_fn_with_state(metrics, track_http_metrics))
        .layer(cors)
}

/// Count and time every request, labelled by its route template.
async fn track_http_metrics(
    State(metrics): State<Arc<AppMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    metrics.record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}
