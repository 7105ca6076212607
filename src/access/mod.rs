pub mod identity;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Coordinator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Authenticated { subject: String, role: Role },
}

impl Caller {
    pub fn role(&self) -> Option<Role> {
        match self {
            Caller::Anonymous => None,
            Caller::Authenticated { role, .. } => Some(*role),
        }
    }

    pub fn subject(&self) -> &str {
        match self {
            Caller::Anonymous => "anonymous",
            Caller::Authenticated { subject, .. } => subject,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateRequest,
    ListRequests,
    GetRequest,
    ListDrivers,
    ListVehicles,
    ViewAnalytics,
    WatchEvents,
    SetStatus,
    Schedule,
    DeleteRequest,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::CreateRequest => "create_request",
            Operation::ListRequests => "list_requests",
            Operation::GetRequest => "get_request",
            Operation::ListDrivers => "list_drivers",
            Operation::ListVehicles => "list_vehicles",
            Operation::ViewAnalytics => "view_analytics",
            Operation::WatchEvents => "watch_events",
            Operation::SetStatus => "set_status",
            Operation::Schedule => "schedule",
            Operation::DeleteRequest => "delete_request",
        }
    }
}

pub fn is_allowed(role: Option<Role>, operation: Operation) -> bool {
    match operation {
        Operation::CreateRequest => true,
        Operation::ListRequests
        | Operation::GetRequest
        | Operation::ListDrivers
        | Operation::ListVehicles
        | Operation::ViewAnalytics
        | Operation::WatchEvents => role.is_some(),
        Operation::SetStatus | Operation::Schedule | Operation::DeleteRequest => {
            role == Some(Role::Coordinator)
        }
    }
}

/// Must run before any lookup of the target, so a denial never reveals whether it exists.
pub fn authorize(caller: &Caller, operation: Operation) -> Result<(), AppError> {
    if is_allowed(caller.role(), operation) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Operation; 10] = [
        Operation::CreateRequest,
        Operation::ListRequests,
        Operation::GetRequest,
        Operation::ListDrivers,
        Operation::ListVehicles,
        Operation::ViewAnalytics,
        Operation::WatchEvents,
        Operation::SetStatus,
        Operation::Schedule,
        Operation::DeleteRequest,
    ];

    #[test]
    fn anonymous_may_only_create() {
        for op in ALL {
            assert_eq!(is_allowed(None, op), op == Operation::CreateRequest, "{op:?}");
        }
    }

    #[test]
    fn viewer_is_read_only() {
        let mutating = [
            Operation::SetStatus,
            Operation::Schedule,
            Operation::DeleteRequest,
        ];
        for op in ALL {
            assert_eq!(
                is_allowed(Some(Role::Viewer), op),
                !mutating.contains(&op),
                "{op:?}"
            );
        }
    }

    #[test]
    fn coordinator_may_do_everything() {
        assert!(ALL.iter().all(|op| is_allowed(Some(Role::Coordinator), *op)));
    }

    #[test]
    fn denial_is_forbidden() {
        let viewer = Caller::Authenticated {
            subject: "viewer@example.com".to_string(),
            role: Role::Viewer,
        };
        assert!(matches!(
            authorize(&viewer, Operation::Schedule),
            Err(AppError::Forbidden)
        ));
        assert!(authorize(&viewer, Operation::GetRequest).is_ok());
    }
}
