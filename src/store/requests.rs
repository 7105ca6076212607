use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::engine::lifecycle::LifecycleEvent;
use crate::error::AppError;
use crate::models::assignment::Assignment;
use crate::models::request::{RequestStatus, ServiceRequest};

/// A request row together with the assignment it owns.
///
/// Keeping the assignment inside the row makes "at most one assignment per
/// request", cascade on delete, and the schedule write a single-row affair.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    seq: u64,
    request: ServiceRequest,
    assignment: Option<Assignment>,
}

impl RequestRecord {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn request(&self) -> &ServiceRequest {
        &self.request
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        self.assignment.as_ref()
    }

    pub fn into_parts(self) -> (ServiceRequest, Option<Assignment>) {
        (self.request, self.assignment)
    }

    pub(crate) fn apply(&mut self, event: LifecycleEvent) -> Result<RequestStatus, AppError> {
        if event == LifecycleEvent::Schedule {
            return Err(AppError::InvalidTransition {
                from: self.request.status(),
                to: RequestStatus::Scheduled,
            });
        }
        self.request.transition(event)
    }

    pub(crate) fn attach_assignment(
        &mut self,
        assignment: Assignment,
    ) -> Result<RequestStatus, AppError> {
        if self.assignment.is_some() {
            return Err(AppError::InvalidTransition {
                from: self.request.status(),
                to: RequestStatus::Scheduled,
            });
        }

        let previous = self.request.transition(LifecycleEvent::Schedule)?;
        self.assignment = Some(assignment);
        Ok(previous)
    }
}

#[derive(Default)]
pub struct RequestStore {
    records: DashMap<Uuid, RequestRecord>,
    next_seq: AtomicU64,
}

impl RequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, request: ServiceRequest) -> Result<RequestRecord, AppError> {
        match self.records.entry(request.id) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "request {} already exists",
                request.id
            ))),
            Entry::Vacant(slot) => {
                let record = RequestRecord {
                    seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
                    request,
                    assignment: None,
                };
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<RequestRecord> {
        self.records.get(id).map(|entry| entry.value().clone())
    }

    /// Read-modify-write under the row's lock. `apply` works on a copy which
    /// replaces the stored row only if it returns `Ok`.
    pub fn update<T, F>(&self, id: &Uuid, apply: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut RequestRecord) -> Result<T, AppError>,
    {
        let mut entry = self
            .records
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("request {id} not found")))?;

        let mut working = entry.value().clone();
        let outcome = apply(&mut working)?;
        *entry.value_mut() = working;

        Ok(outcome)
    }

    pub fn remove(&self, id: &Uuid) -> Option<RequestRecord> {
        self.records.remove(id).map(|(_, record)| record)
    }

    pub fn snapshot(&self) -> Vec<RequestRecord> {
        self.records
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::request::NewServiceRequest;

    fn request() -> ServiceRequest {
        ServiceRequest::pending(
            NewServiceRequest {
                customer_name: "Nimal Fernando".to_string(),
                phone: "0771234567".to_string(),
                pickup_location: "Galle".to_string(),
                dropoff_location: "Matara".to_string(),
                pickup_time: Utc::now(),
                passengers: 2,
                notes: None,
            },
            Utc::now(),
        )
    }

    fn assignment(request_id: Uuid) -> Assignment {
        Assignment {
            id: Uuid::new_v4(),
            request_id,
            driver_id: Uuid::new_v4(),
            vehicle_id: Uuid::new_v4(),
            scheduled_time: Utc::now(),
            assigned_at: Utc::now(),
        }
    }

    #[test]
    fn insert_assigns_increasing_sequence() {
        let store = RequestStore::new();
        let first = store.insert(request()).unwrap();
        let second = store.insert(request()).unwrap();
        assert!(second.seq() > first.seq());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn duplicate_id_is_a_conflict() {
        let store = RequestStore::new();
        let req = request();
        store.insert(req.clone()).unwrap();
        assert!(matches!(store.insert(req), Err(AppError::Conflict(_))));
    }

    #[test]
    fn failed_update_leaves_row_untouched() {
        let store = RequestStore::new();
        let id = store.insert(request()).unwrap().request().id;

        let result = store.update(&id, |record| {
            record.apply(LifecycleEvent::Approve)?;
            record.apply(LifecycleEvent::Reject)
        });

        assert!(matches!(result, Err(AppError::InvalidTransition { .. })));
        assert_eq!(
            store.get(&id).unwrap().request().status(),
            RequestStatus::Pending
        );
    }

    #[test]
    fn schedule_event_requires_an_assignment() {
        let store = RequestStore::new();
        let id = store.insert(request()).unwrap().request().id;

        store
            .update(&id, |record| record.apply(LifecycleEvent::Approve))
            .unwrap();
        let bare = store.update(&id, |record| record.apply(LifecycleEvent::Schedule));
        assert!(matches!(bare, Err(AppError::InvalidTransition { .. })));

        store
            .update(&id, |record| record.attach_assignment(assignment(id)))
            .unwrap();
        let again = store.update(&id, |record| record.attach_assignment(assignment(id)));
        assert!(matches!(
            again,
            Err(AppError::InvalidTransition {
                from: RequestStatus::Scheduled,
                to: RequestStatus::Scheduled
            })
        ));

        let record = store.get(&id).unwrap();
        assert_eq!(record.request().status(), RequestStatus::Scheduled);
        assert!(record.assignment().is_some());
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let store = RequestStore::new();
        let result = store.update(&Uuid::new_v4(), |_| Ok(()));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
