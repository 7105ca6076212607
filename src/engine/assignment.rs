use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::access::{Caller, Operation};
use crate::engine::gate;
use crate::engine::lifecycle::LifecycleEvent;
use crate::error::AppError;
use crate::models::assignment::{Assignment, ScheduleCommand, ScheduleOutcome};
use crate::models::event::RequestEvent;
use crate::models::request::RequestStatus;
use crate::state::AppState;

pub fn schedule(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
    command: ScheduleCommand,
) -> Result<ScheduleOutcome, AppError> {
    gate(state, caller, Operation::Schedule)?;

    let result = state.requests.update(&id, |record| {
        let current = record.request().status();
        if current != RequestStatus::Approved || record.assignment().is_some() {
            return Err(AppError::InvalidTransition {
                from: current,
                to: RequestStatus::Scheduled,
            });
        }

        state.registry.driver(&command.driver_id).ok_or_else(|| {
            AppError::NotFound(format!("driver {} not found", command.driver_id))
        })?;
        let vehicle = state.registry.vehicle(&command.vehicle_id).ok_or_else(|| {
            AppError::NotFound(format!("vehicle {} not found", command.vehicle_id))
        })?;

        if record.request().passengers > vehicle.capacity {
            warn!(
                request_id = %id,
                vehicle_id = %vehicle.id,
                passengers = record.request().passengers,
                capacity = vehicle.capacity,
                "scheduling a vehicle smaller than the party"
            );
        }

        let assignment = Assignment {
            id: Uuid::new_v4(),
            request_id: id,
            driver_id: command.driver_id,
            vehicle_id: command.vehicle_id,
            scheduled_time: command.scheduled_time,
            assigned_at: Utc::now(),
        };
        record.attach_assignment(assignment.clone())?;
        state.publish(RequestEvent::Scheduled {
            request_id: id,
            assignment: assignment.clone(),
        });

        Ok(ScheduleOutcome {
            request: record.request().clone(),
            assignment,
        })
    });

    let event = LifecycleEvent::Schedule.as_str();
    match result {
        Ok(outcome) => {
            state.metrics.record_transition(event, true);
            info!(
                request_id = %id,
                assignment_id = %outcome.assignment.id,
                driver_id = %outcome.assignment.driver_id,
                vehicle_id = %outcome.assignment.vehicle_id,
                scheduled_time = %outcome.assignment.scheduled_time,
                subject = caller.subject(),
                "request scheduled"
            );
            Ok(outcome)
        }
        Err(err) => {
            if matches!(err, AppError::InvalidTransition { .. }) {
                state.metrics.record_transition(event, false);
            }
            info!(request_id = %id, error = %err, "schedule refused");
            Err(err)
        }
    }
}
