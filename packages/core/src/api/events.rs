//! Local events routes.
//!
//! - `GET /events?airport=MIA&category=concerts&force=false`
//! - `GET /events/high-impact?airports=MIA,LAS`

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::ApiState;
use crate::acquisition::Acquired;
use crate::error::AppError;
use crate::services::events::{EventCategory, EventQuery, EventsSnapshot};
use crate::signals::EventSignal;

#[derive(Debug, Deserialize)]
pub struct EventsParams {
    pub airport: String,
    pub category: Option<String>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub struct HighImpactParams {
    /// Comma separated IATA codes.
    pub airports: String,
}

pub fn create_events_router() -> Router<ApiState> {
    Router::new()
        .route("/events", get(get_events))
        .route("/events/high-impact", get(get_high_impact_events))
}

pub async fn get_events(
    State(context): State<ApiState>,
    Query(params): Query<EventsParams>,
) -> Result<Json<Acquired<EventsSnapshot>>, AppError> {
    let category = match params.category.as_deref() {
        Some(raw) => raw.parse::<EventCategory>()?,
        None => EventCategory::default(),
    };
    let query = EventQuery::with_category(&params.airport, category)?;
    Ok(Json(context.acquire_events(&query, params.force).await))
}

pub async fn get_high_impact_events(
    State(context): State<ApiState>,
    Query(params): Query<HighImpactParams>,
) -> Result<Json<Vec<EventSignal>>, AppError> {
    let airports: Vec<String> = params
        .airports
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect();

    Ok(Json(context.high_impact_events(&airports).await?))
}
