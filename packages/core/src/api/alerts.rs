//! `GET /alerts` — drain pending alerts.
//!
//! Each alert is delivered once; a second call returns only alerts raised
//! since the first.

use axum::{extract::State, routing::get, Json, Router};

use super::ApiState;
use crate::signals::Alert;

pub fn create_alerts_router() -> Router<ApiState> {
    Router::new().route("/alerts", get(drain_alerts))
}

pub async fn drain_alerts(State(context): State<ApiState>) -> Json<Vec<Alert>> {
    Json(context.drain_alerts().await)
}
