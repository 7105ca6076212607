use tracing::info;
use uuid::Uuid;

use crate::access::{Caller, Operation};
use crate::engine::gate;
use crate::error::AppError;
use crate::models::event::RequestEvent;
use crate::models::request::{RequestStatus, ServiceRequest};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Approve,
    Reject,
    Schedule,
}

impl LifecycleEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            LifecycleEvent::Approve => "approve",
            LifecycleEvent::Reject => "reject",
            LifecycleEvent::Schedule => "schedule",
        }
    }

    pub const fn target(self) -> RequestStatus {
        match self {
            LifecycleEvent::Approve => RequestStatus::Approved,
            LifecycleEvent::Reject => RequestStatus::Rejected,
            LifecycleEvent::Schedule => RequestStatus::Scheduled,
        }
    }

    pub const fn for_status_update(status: RequestStatus) -> Option<Self> {
        match status {
            RequestStatus::Approved => Some(LifecycleEvent::Approve),
            RequestStatus::Rejected => Some(LifecycleEvent::Reject),
            RequestStatus::Pending | RequestStatus::Scheduled => None,
        }
    }
}

const TRANSITIONS: &[(RequestStatus, LifecycleEvent, RequestStatus)] = &[
    (
        RequestStatus::Pending,
        LifecycleEvent::Approve,
        RequestStatus::Approved,
    ),
    (
        RequestStatus::Pending,
        LifecycleEvent::Reject,
        RequestStatus::Rejected,
    ),
    (
        RequestStatus::Approved,
        LifecycleEvent::Schedule,
        RequestStatus::Scheduled,
    ),
];

pub fn next_status(from: RequestStatus, event: LifecycleEvent) -> Option<RequestStatus> {
    TRANSITIONS
        .iter()
        .find(|(state, candidate, _)| *state == from && *candidate == event)
        .map(|(_, _, to)| *to)
}

pub fn set_status(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
    status: RequestStatus,
) -> Result<ServiceRequest, AppError> {
    gate(state, caller, Operation::SetStatus)?;

    let result = state.requests.update(&id, |record| {
        let from = record.request().status();
        let event = LifecycleEvent::for_status_update(status)
            .ok_or(AppError::InvalidTransition { from, to: status })?;
        record.apply(event)?;
        state.publish(RequestEvent::StatusChanged {
            request_id: id,
            from,
            to: record.request().status(),
        });
        Ok((from, record.request().clone()))
    });

    let label = LifecycleEvent::for_status_update(status)
        .map(LifecycleEvent::as_str)
        .unwrap_or("invalid");

    match result {
        Ok((from, request)) => {
            state.metrics.record_transition(label, true);
            info!(
                request_id = %id,
                from = %from,
                to = %request.status(),
                subject = caller.subject(),
                "request status changed"
            );
            Ok(request)
        }
        Err(err) => {
            if matches!(err, AppError::InvalidTransition { .. }) {
                state.metrics.record_transition(label, false);
                info!(request_id = %id, error = %err, "status change refused");
            }
            Err(err)
        }
    }
}
