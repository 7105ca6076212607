use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::engine::lifecycle::{self, LifecycleEvent};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Scheduled,
}

impl RequestStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Scheduled => "scheduled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Scheduled)
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            "scheduled" => Ok(RequestStatus::Scheduled),
            other => Err(format!("unknown status `{other}`")),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewServiceRequest {
    #[validate(length(min = 2, max = 120), custom = "not_blank")]
    pub customer_name: String,
    #[validate(custom = "phone_number")]
    pub phone: String,
    #[validate(length(max = 255), custom = "not_blank")]
    pub pickup_location: String,
    #[validate(length(max = 255), custom = "not_blank")]
    pub dropoff_location: String,
    pub pickup_time: DateTime<Utc>,
    #[validate(range(min = 1))]
    pub passengers: u32,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub notes: Option<String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn phone_number(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    let body = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let well_formed = body
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-');
    let digits = body.chars().filter(char::is_ascii_digit).count();

    if well_formed && (7..=15).contains(&digits) {
        Ok(())
    } else {
        Err(ValidationError::new("phone"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub customer_name: String,
    pub phone: String,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub pickup_time: DateTime<Utc>,
    pub passengers: u32,
    pub notes: Option<String>,
    status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl ServiceRequest {
    pub fn pending(fields: NewServiceRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_name: fields.customer_name.trim().to_string(),
            phone: fields.phone.trim().to_string(),
            pickup_location: fields.pickup_location.trim().to_string(),
            dropoff_location: fields.dropoff_location.trim().to_string(),
            pickup_time: fields.pickup_time,
            passengers: fields.passengers,
            notes: fields
                .notes
                .map(|notes| notes.trim().to_string())
                .filter(|notes| !notes.is_empty()),
            status: RequestStatus::Pending,
            created_at,
        }
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    /// The only write path to `status`. Returns the previous status.
    pub(crate) fn transition(&mut self, event: LifecycleEvent) -> Result<RequestStatus, AppError> {
        let from = self.status;
        let to = lifecycle::next_status(from, event).ok_or(AppError::InvalidTransition {
            from,
            to: event.target(),
        })?;
        self.status = to;
        Ok(from)
    }

    pub fn matches_text(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.customer_name.to_lowercase().contains(&needle)
            || self.phone.to_lowercase().contains(&needle)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub text_query: Option<String>,
}

impl RequestFilter {
    pub fn matches(&self, request: &ServiceRequest) -> bool {
        if let Some(status) = self.status {
            if request.status() != status {
                return false;
            }
        }

        match self.text_query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => request.matches_text(query),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Validate)]
pub struct PageRequest {
    #[validate(range(min = 1))]
    pub page: u32,
    #[validate(range(min = 1, max = 100))]
    pub page_size: u32,
}

impl PageRequest {
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.page_size as usize)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentSummary {
    pub assignment_id: Uuid,
    pub driver_id: Uuid,
    pub driver_name: Option<String>,
    pub vehicle_id: Uuid,
    pub vehicle_plate: Option<String>,
    pub scheduled_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    #[serde(flatten)]
    pub request: ServiceRequest,
    pub assignment: Option<AssignmentSummary>,
}
