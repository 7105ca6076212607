use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::request::ServiceRequest;

#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub id: Uuid,
    pub request_id: Uuid,
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub scheduled_time: DateTime<Utc>,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleCommand {
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub scheduled_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleOutcome {
    pub request: ServiceRequest,
    pub assignment: Assignment,
}
