use std::sync::Arc;
use std::thread;

use chrono::{Duration, Utc};
use trip_dispatch::access::{Caller, Role};
use trip_dispatch::config::{Config, LogFormat};
use trip_dispatch::engine::{analytics, assignment, catalog, lifecycle, requests};
use trip_dispatch::error::AppError;
use trip_dispatch::models::assignment::ScheduleCommand;
use trip_dispatch::models::event::RequestEvent;
use trip_dispatch::models::request::{
    NewServiceRequest, PageRequest, RequestFilter, RequestStatus,
};
use trip_dispatch::state::AppState;
use uuid::Uuid;

fn state() -> AppState {
    AppState::new(&Config {
        http_port: 0,
        log_level: "info".to_string(),
        log_format: LogFormat::Compact,
        event_buffer_size: 64,
        jwt_secret: "lifecycle-secret".to_string(),
        max_passengers: 60,
        analytics_utc_offset_minutes: 330,
        seed_catalog: false,
    })
    .unwrap()
}

fn coordinator() -> Caller {
    Caller::Authenticated {
        subject: "coord@example.com".to_string(),
        role: Role::Coordinator,
    }
}

fn viewer() -> Caller {
    Caller::Authenticated {
        subject: "viewer@example.com".to_string(),
        role: Role::Viewer,
    }
}

fn fields(name: &str, passengers: u32) -> NewServiceRequest {
    NewServiceRequest {
        customer_name: name.to_string(),
        phone: "0712345678".to_string(),
        pickup_location: "Colombo".to_string(),
        dropoff_location: "Galle".to_string(),
        pickup_time: Utc::now() + Duration::days(1),
        passengers,
        notes: None,
    }
}

fn command(state: &AppState) -> ScheduleCommand {
    let driver = state.registry.add_driver("Bimal Silva", "0722222222");
    let vehicle = state.registry.add_vehicle("WP-5678", 20);
    ScheduleCommand {
        driver_id: driver.id,
        vehicle_id: vehicle.id,
        scheduled_time: Utc::now() + Duration::days(1),
    }
}

fn approved(state: &AppState, name: &str) -> Uuid {
    let request = requests::create_request(state, &Caller::Anonymous, fields(name, 4)).unwrap();
    lifecycle::set_status(state, &coordinator(), request.id, RequestStatus::Approved).unwrap();
    request.id
}

fn assert_assignment_iff_scheduled(state: &AppState) {
    for record in state.requests.snapshot() {
        assert_eq!(
            record.assignment().is_some(),
            record.request().status() == RequestStatus::Scheduled,
            "request {}",
            record.request().id
        );
    }
}

#[test]
fn walkthrough_create_approve_schedule_delete() {
    let state = state();
    let mut events = state.events_tx.subscribe();
    let cmd = command(&state);

    let r1 = requests::create_request(&state, &Caller::Anonymous, fields("A Perera", 4)).unwrap();
    assert_eq!(r1.status(), RequestStatus::Pending);

    let r1_approved =
        lifecycle::set_status(&state, &coordinator(), r1.id, RequestStatus::Approved).unwrap();
    assert_eq!(r1_approved.status(), RequestStatus::Approved);

    let outcome = assignment::schedule(&state, &coordinator(), r1.id, cmd.clone()).unwrap();
    assert_eq!(outcome.request.status(), RequestStatus::Scheduled);
    assert_eq!(outcome.assignment.request_id, r1.id);
    assert_eq!(outcome.assignment.driver_id, cmd.driver_id);
    assert_eq!(outcome.assignment.vehicle_id, cmd.vehicle_id);
    assert_eq!(outcome.assignment.scheduled_time, cmd.scheduled_time);
    assert_assignment_iff_scheduled(&state);

    requests::delete_request(&state, &coordinator(), r1.id).unwrap();
    assert!(matches!(
        requests::get_request(&state, &viewer(), r1.id),
        Err(AppError::NotFound(_))
    ));
    assert!(state.requests.is_empty());

    let kinds: Vec<&str> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|event| match event {
            RequestEvent::Created { .. } => "created",
            RequestEvent::StatusChanged { .. } => "status_changed",
            RequestEvent::Scheduled { .. } => "scheduled",
            RequestEvent::Deleted { .. } => "deleted",
        })
        .collect();
    assert_eq!(kinds, vec!["created", "status_changed", "scheduled", "deleted"]);
}

#[test]
fn second_schedule_fails_and_keeps_one_assignment() {
    let state = state();
    let cmd = command(&state);
    let id = approved(&state, "Twice Tharindu");

    let first = assignment::schedule(&state, &coordinator(), id, cmd.clone()).unwrap();
    let second = assignment::schedule(&state, &coordinator(), id, cmd);

    assert!(matches!(
        second,
        Err(AppError::InvalidTransition {
            from: RequestStatus::Scheduled,
            to: RequestStatus::Scheduled
        })
    ));
    let record = state.requests.get(&id).unwrap();
    assert_eq!(record.assignment().map(|a| a.id), Some(first.assignment.id));
}

#[test]
fn schedule_with_unknown_driver_or_vehicle_changes_nothing() {
    let state = state();
    let cmd = command(&state);
    let id = approved(&state, "Missing Malini");

    let unknown_driver = ScheduleCommand {
        driver_id: Uuid::new_v4(),
        ..cmd.clone()
    };
    let unknown_vehicle = ScheduleCommand {
        vehicle_id: Uuid::new_v4(),
        ..cmd
    };

    assert!(matches!(
        assignment::schedule(&state, &coordinator(), id, unknown_driver),
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        assignment::schedule(&state, &coordinator(), id, unknown_vehicle),
        Err(AppError::NotFound(_))
    ));

    let record = state.requests.get(&id).unwrap();
    assert_eq!(record.request().status(), RequestStatus::Approved);
    assert!(record.assignment().is_none());
}

#[test]
fn schedule_accepts_past_timestamps() {
    let state = state();
    let mut cmd = command(&state);
    cmd.scheduled_time = Utc::now() - Duration::days(30);
    let id = approved(&state, "Backdated Bandara");

    let outcome = assignment::schedule(&state, &coordinator(), id, cmd).unwrap();
    assert_eq!(outcome.request.status(), RequestStatus::Scheduled);
}

#[test]
fn terminal_states_refuse_every_status_update() {
    let state = state();
    let rejected = requests::create_request(&state, &Caller::Anonymous, fields("Rita", 2)).unwrap();
    lifecycle::set_status(&state, &coordinator(), rejected.id, RequestStatus::Rejected).unwrap();

    let scheduled = approved(&state, "Sunil");
    let cmd = command(&state);
    assignment::schedule(&state, &coordinator(), scheduled, cmd).unwrap();

    for id in [rejected.id, scheduled] {
        for target in [
            RequestStatus::Pending,
            RequestStatus::Approved,
            RequestStatus::Rejected,
            RequestStatus::Scheduled,
        ] {
            let result = lifecycle::set_status(&state, &coordinator(), id, target);
            assert!(
                matches!(result, Err(AppError::InvalidTransition { to, .. }) if to == target),
                "{id} -> {target}"
            );
        }
    }
    assert_assignment_iff_scheduled(&state);
}

#[test]
fn set_status_cannot_shortcut_to_scheduled() {
    let state = state();
    let id = approved(&state, "Shortcut Shanika");

    let result = lifecycle::set_status(&state, &coordinator(), id, RequestStatus::Scheduled);
    assert!(matches!(
        result,
        Err(AppError::InvalidTransition {
            from: RequestStatus::Approved,
            to: RequestStatus::Scheduled
        })
    ));
    assert_assignment_iff_scheduled(&state);
}

#[test]
fn viewer_is_forbidden_regardless_of_existence() {
    let state = state();
    let cmd = command(&state);
    let id = approved(&state, "Viewer Target");

    for target in [id, Uuid::new_v4()] {
        assert!(matches!(
            lifecycle::set_status(&state, &viewer(), target, RequestStatus::Rejected),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            assignment::schedule(&state, &viewer(), target, cmd.clone()),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            requests::delete_request(&state, &viewer(), target),
            Err(AppError::Forbidden)
        ));
    }
    assert!(matches!(
        catalog::list_drivers(&state, &Caller::Anonymous),
        Err(AppError::Forbidden)
    ));
    assert!(catalog::list_vehicles(&state, &viewer()).is_ok());
}

#[test]
fn delete_unknown_request_is_not_found() {
    let state = state();
    assert!(matches!(
        requests::delete_request(&state, &coordinator(), Uuid::new_v4()),
        Err(AppError::NotFound(_))
    ));
}

#[test]
fn concurrent_approve_and_reject_have_one_winner() {
    for _ in 0..50 {
        let state = Arc::new(state());
        let id = requests::create_request(&state, &Caller::Anonymous, fields("Race Ruwan", 3))
            .unwrap()
            .id;

        let outcomes: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = [RequestStatus::Approved, RequestStatus::Rejected]
                .into_iter()
                .map(|target| {
                    let state = Arc::clone(&state);
                    scope.spawn(move || lifecycle::set_status(&state, &coordinator(), id, target))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let wins = outcomes.iter().filter(|result| result.is_ok()).count();
        let refused = outcomes
            .iter()
            .filter(|result| matches!(result, Err(AppError::InvalidTransition { .. })))
            .count();
        assert_eq!((wins, refused), (1, 1));
    }
}

#[test]
fn concurrent_schedules_create_exactly_one_assignment() {
    let state = Arc::new(state());
    let cmd = command(&state);
    let id = approved(&state, "Crowded Chathura");

    let successes = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let state = Arc::clone(&state);
                let cmd = cmd.clone();
                scope.spawn(move || assignment::schedule(&state, &coordinator(), id, cmd).is_ok())
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count()
    });

    assert_eq!(successes, 1);
    assert_assignment_iff_scheduled(&state);
}

#[test]
fn list_joins_assignment_and_counts_matches() {
    let state = state();
    let cmd = command(&state);
    let id = approved(&state, "Joined Janaka");
    assignment::schedule(&state, &coordinator(), id, cmd).unwrap();
    requests::create_request(&state, &Caller::Anonymous, fields("Other Oshadi", 1)).unwrap();

    let filter = RequestFilter {
        status: Some(RequestStatus::Scheduled),
        text_query: None,
    };
    let page = requests::list_requests(&state, &viewer(), &filter, PageRequest::default()).unwrap();

    assert_eq!(page.total, 1);
    let summary = page.items[0].assignment.as_ref().unwrap();
    assert_eq!(summary.driver_name.as_deref(), Some("Bimal Silva"));
    assert_eq!(summary.vehicle_plate.as_deref(), Some("WP-5678"));

    let zero_page = PageRequest {
        page: 0,
        page_size: 10,
    };
    assert!(matches!(
        requests::list_requests(&state, &viewer(), &RequestFilter::default(), zero_page),
        Err(AppError::Validation(_))
    ));
}

#[test]
fn analytics_rejects_out_of_range_window() {
    let state = state();
    assert!(matches!(
        analytics::daily_summary(&state, &viewer(), 0),
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        analytics::daily_summary(&state, &Caller::Anonymous, 7),
        Err(AppError::Forbidden)
    ));
    assert!(analytics::daily_summary(&state, &viewer(), 7)
        .unwrap()
        .is_empty());
}

#[test]
fn status_update_to_pending_is_counted_as_invalid() {
    let state = state();
    let request =
        requests::create_request(&state, &Caller::Anonymous, fields("Loop Lasith", 2)).unwrap();

    assert!(matches!(
        lifecycle::set_status(&state, &coordinator(), request.id, RequestStatus::Pending),
        Err(AppError::InvalidTransition { .. })
    ));

    let text = state.metrics.encode().unwrap();
    assert!(text.contains(r#"transitions_total{event="invalid",outcome="rejected"} 1"#));
    assert!(!text.contains(r#"event="pending""#));
}

#[test]
fn events_follow_commit_order_under_contention() {
    for _ in 0..50 {
        let state = Arc::new(state());
        let cmd = command(&state);
        let mut events = state.events_tx.subscribe();
        let id = requests::create_request(&state, &Caller::Anonymous, fields("Order Oshan", 3))
            .unwrap()
            .id;

        thread::scope(|scope| {
            let scheduler = {
                let state = Arc::clone(&state);
                let cmd = cmd.clone();
                scope.spawn(move || loop {
                    match assignment::schedule(&state, &coordinator(), id, cmd.clone()) {
                        Ok(_) => break,
                        Err(AppError::InvalidTransition { .. }) => thread::yield_now(),
                        Err(other) => panic!("unexpected schedule error: {other}"),
                    }
                })
            };
            let approver = {
                let state = Arc::clone(&state);
                scope.spawn(move || {
                    lifecycle::set_status(&state, &coordinator(), id, RequestStatus::Approved)
                })
            };
            approver.join().unwrap().unwrap();
            scheduler.join().unwrap();
        });

        let kinds: Vec<&str> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|event| match event {
                RequestEvent::Created { .. } => "created",
                RequestEvent::StatusChanged { .. } => "status_changed",
                RequestEvent::Scheduled { .. } => "scheduled",
                RequestEvent::Deleted { .. } => "deleted",
            })
            .collect();
        assert_eq!(kinds, vec!["created", "status_changed", "scheduled"]);
    }
}
