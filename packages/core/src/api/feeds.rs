//! Budget, cache and feed health inspection.
//!
//! - `GET    /budget`        — remaining calls per provider
//! - `GET    /cache`         — every cached entry with its staleness
//! - `DELETE /cache`         — drop every cached entry (budgets untouched)
//! - `GET    /feeds/health`  — per-feed freshness classification

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::ApiState;
use crate::context::{BudgetOverview, CacheOverview};
use crate::feed_health::FeedHealthReport;

pub fn create_feeds_router() -> Router<ApiState> {
    Router::new()
        .route("/budget", get(get_budget))
        .route("/cache", get(get_cache).delete(clear_cache))
        .route("/feeds/health", get(get_feed_health))
}

pub async fn get_budget(State(context): State<ApiState>) -> Json<BudgetOverview> {
    Json(context.budget().await)
}

pub async fn get_cache(State(context): State<ApiState>) -> Json<CacheOverview> {
    Json(context.cached_all().await)
}

pub async fn clear_cache(State(context): State<ApiState>) -> StatusCode {
    context.clear_caches().await;
    StatusCode::NO_CONTENT
}

pub async fn get_feed_health(State(context): State<ApiState>) -> Json<Vec<FeedHealthReport>> {
    Json(context.feed_health.report().await)
}
