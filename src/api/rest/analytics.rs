use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::access::Operation;
use crate::api::rest::caller::CallerIdentity;
use crate::engine::analytics::{self, DEFAULT_WINDOW_DAYS};
use crate::engine::gate;
use crate::error::AppError;
use crate::models::analytics::DailySummary;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/analytics/daily", get(daily))
}

#[derive(Deserialize)]
pub struct DailyQuery {
    pub days: Option<u32>,
}

async fn daily(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    query: Result<Query<DailyQuery>, QueryRejection>,
) -> Result<Json<Vec<DailySummary>>, AppError> {
    gate(&state, &caller, Operation::ViewAnalytics)?;
    let Query(query) =
        query.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let window = query.days.unwrap_or(DEFAULT_WINDOW_DAYS);
    analytics::daily_summary(&state, &caller, window).map(Json)
}
