use std::cmp::Reverse;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::access::{Caller, Operation};
use crate::engine::gate;
use crate::error::AppError;
use crate::models::event::RequestEvent;
use crate::models::request::{
    AssignmentSummary, NewServiceRequest, Page, PageRequest, RequestFilter, RequestView,
    ServiceRequest,
};
use crate::state::AppState;
use crate::store::requests::RequestRecord;

pub fn create_request(
    state: &AppState,
    caller: &Caller,
    fields: NewServiceRequest,
) -> Result<ServiceRequest, AppError> {
    gate(state, caller, Operation::CreateRequest)?;

    fields.validate()?;
    if fields.passengers > state.settings.max_passengers {
        return Err(AppError::field("passengers", "exceeds_fleet_capacity"));
    }

    let record = state
        .requests
        .insert(ServiceRequest::pending(fields, Utc::now()))?;
    let request = record.request().clone();

    state.metrics.requests_created_total.inc();
    state.metrics.requests_stored.set(state.requests.len() as i64);
    info!(
        request_id = %request.id,
        passengers = request.passengers,
        pickup_time = %request.pickup_time,
        "service request created"
    );
    state.publish(RequestEvent::Created {
        request: request.clone(),
    });

    Ok(request)
}

pub fn list_requests(
    state: &AppState,
    caller: &Caller,
    filter: &RequestFilter,
    page: PageRequest,
) -> Result<Page<RequestView>, AppError> {
    gate(state, caller, Operation::ListRequests)?;
    page.validate()?;

    let mut matching: Vec<RequestRecord> = state
        .requests
        .snapshot()
        .into_iter()
        .filter(|record| filter.matches(record.request()))
        .collect();
    matching.sort_by_key(|record| Reverse((record.request().created_at, record.seq())));

    let total = matching.len();
    let items = matching
        .into_iter()
        .skip(page.offset())
        .take(page.page_size as usize)
        .map(|record| view(state, record))
        .collect();

    Ok(Page {
        items,
        total,
        page: page.page,
        page_size: page.page_size,
    })
}

pub fn get_request(state: &AppState, caller: &Caller, id: Uuid) -> Result<RequestView, AppError> {
    gate(state, caller, Operation::GetRequest)?;

    state
        .requests
        .get(&id)
        .map(|record| view(state, record))
        .ok_or_else(|| AppError::NotFound(format!("request {id} not found")))
}

pub fn delete_request(state: &AppState, caller: &Caller, id: Uuid) -> Result<(), AppError> {
    gate(state, caller, Operation::DeleteRequest)?;

    let record = state
        .requests
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("request {id} not found")))?;

    state.metrics.requests_stored.set(state.requests.len() as i64);
    info!(
        request_id = %id,
        status = %record.request().status(),
        had_assignment = record.assignment().is_some(),
        subject = caller.subject(),
        "service request deleted"
    );
    state.publish(RequestEvent::Deleted { request_id: id });

    Ok(())
}

fn view(state: &AppState, record: RequestRecord) -> RequestView {
    let (request, assignment) = record.into_parts();
    let assignment = assignment.map(|assignment| AssignmentSummary {
        assignment_id: assignment.id,
        driver_id: assignment.driver_id,
        driver_name: state
            .registry
            .driver(&assignment.driver_id)
            .map(|driver| driver.name),
        vehicle_id: assignment.vehicle_id,
        vehicle_plate: state
            .registry
            .vehicle(&assignment.vehicle_id)
            .map(|vehicle| vehicle.plate),
        scheduled_time: assignment.scheduled_time,
    });

    RequestView {
        request,
        assignment,
    }
}
