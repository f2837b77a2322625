//! `GET /fares` — competitive fares for one route and date.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::ApiState;
use crate::acquisition::Acquired;
use crate::error::AppError;
use crate::services::fares::{FareQuery, FareSnapshot};

#[derive(Debug, Deserialize)]
pub struct FaresParams {
    pub origin: String,
    pub destination: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// Bypass a fresh cache entry. Budget rules still apply.
    #[serde(default)]
    pub force: bool,
}

pub fn create_fares_router() -> Router<ApiState> {
    Router::new().route("/fares", get(get_fares))
}

pub async fn get_fares(
    State(context): State<ApiState>,
    Query(params): Query<FaresParams>,
) -> Result<Json<Acquired<FareSnapshot>>, AppError> {
    let query = FareQuery::new(&params.origin, &params.destination, &params.date)?;
    Ok(Json(context.acquire_fares(&query, params.force).await))
}
