use serde::Serialize;
use uuid::Uuid;

use crate::models::assignment::Assignment;
use crate::models::request::{RequestStatus, ServiceRequest};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestEvent {
    Created {
        request: ServiceRequest,
    },
    StatusChanged {
        request_id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    },
    Scheduled {
        request_id: Uuid,
        assignment: Assignment,
    },
    Deleted {
        request_id: Uuid,
    },
}
