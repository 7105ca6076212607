use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;
use axum::Router;

use crate::api::rest::caller::CallerIdentity;
use crate::engine::catalog;
use crate::error::AppError;
use crate::models::driver::Driver;
use crate::models::vehicle::Vehicle;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", get(list_drivers))
        .route("/vehicles", get(list_vehicles))
}

async fn list_drivers(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
) -> Result<Json<Vec<Driver>>, AppError> {
    catalog::list_drivers(&state, &caller).map(Json)
}

async fn list_vehicles(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
) -> Result<Json<Vec<Vehicle>>, AppError> {
    catalog::list_vehicles(&state, &caller).map(Json)
}
