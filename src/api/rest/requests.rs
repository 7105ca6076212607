use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::access::Operation;
use crate::api::rest::caller::CallerIdentity;
use crate::engine::{assignment, gate, lifecycle, requests};
use crate::error::AppError;
use crate::models::assignment::{ScheduleCommand, ScheduleOutcome};
use crate::models::request::{
    NewServiceRequest, Page, PageRequest, RequestFilter, RequestStatus, RequestView,
    ServiceRequest,
};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/service-requests",
            post(create_request).get(list_requests),
        )
        .route(
            "/service-requests/:id",
            get(get_request).delete(delete_request),
        )
        .route("/service-requests/:id/status", patch(update_status))
        .route("/service-requests/:id/schedule", post(schedule_request))
}

#[derive(Deserialize)]
pub struct ListQuery {
    // The dashboard sends `status=` for "all".
    pub status: Option<String>,
    pub q: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: RequestStatus,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn request_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    path.map(|Path(id)| id)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn status_filter(raw: Option<&str>) -> Result<Option<RequestStatus>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("unknown status `{value}`"))),
    }
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    payload: Result<Json<NewServiceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ServiceRequest>), AppError> {
    let fields = body(payload)?;
    let request = requests::create_request(&state, &caller, fields)?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn list_requests(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Page<RequestView>>, AppError> {
    gate(&state, &caller, Operation::ListRequests)?;
    let Query(query) =
        query.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let defaults = PageRequest::default();
    let page = PageRequest {
        page: query.page.unwrap_or(defaults.page),
        page_size: query.page_size.unwrap_or(defaults.page_size),
    };
    let filter = RequestFilter {
        status: status_filter(query.status.as_deref())?,
        text_query: query.q,
    };

    requests::list_requests(&state, &caller, &filter, page).map(Json)
}

async fn get_request(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<RequestView>, AppError> {
    gate(&state, &caller, Operation::GetRequest)?;
    let id = request_id(path)?;
    requests::get_request(&state, &caller, id).map(Json)
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<ServiceRequest>, AppError> {
    // Role check before the id or body is parsed, so callers without the
    // role always see 403.
    gate(&state, &caller, Operation::SetStatus)?;
    let id = request_id(path)?;
    let update = body(payload)?;
    lifecycle::set_status(&state, &caller, id, update.status).map(Json)
}

async fn schedule_request(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ScheduleCommand>, JsonRejection>,
) -> Result<Json<ScheduleOutcome>, AppError> {
    gate(&state, &caller, Operation::Schedule)?;
    let id = request_id(path)?;
    let command = body(payload)?;
    assignment::schedule(&state, &caller, id, command).map(Json)
}

async fn delete_request(
    State(state): State<Arc<AppState>>,
    CallerIdentity(caller): CallerIdentity,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    gate(&state, &caller, Operation::DeleteRequest)?;
    let id = request_id(path)?;
    requests::delete_request(&state, &caller, id)?;
    Ok(StatusCode::NO_CONTENT)
}
