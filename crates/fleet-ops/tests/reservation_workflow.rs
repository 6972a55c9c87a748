//! Integration specifications for the reservation admission engine.
//!
//! Scenarios drive the public service facade and HTTP router end to end:
//! the booking walk-through from the fleet desk, the double-booking race,
//! and the availability endpoint contract.

mod common {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};

    use fleet_ops::workflows::reservations::{
        AdmissionConfig, AdmissionService, BookingWindow, CustomerRef, InMemoryEventPublisher,
        InMemoryReservationRepository, Reservation, ReservationDraft, ReservationStatus,
        ResourceId, ResourceLinks, TenantId,
    };
    use fleet_ops::workflows::reservations::CommitOutcome;

    pub(super) type MemoryService =
        AdmissionService<InMemoryReservationRepository, InMemoryEventPublisher>;

    pub(super) fn tenant() -> TenantId {
        TenantId("acme-rentals".to_string())
    }

    pub(super) fn vehicle(id: &str) -> ResourceId {
        ResourceId(id.to_string())
    }

    pub(super) fn instant(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .expect("valid rfc3339 timestamp")
            .with_timezone(&Utc)
    }

    pub(super) fn window(start: &str, end: &str) -> BookingWindow {
        BookingWindow::new(instant(start), instant(end)).expect("valid window")
    }

    pub(super) fn draft(resources: ResourceLinks, window: BookingWindow) -> ReservationDraft {
        ReservationDraft {
            tenant: tenant(),
            customer: CustomerRef {
                customer_id: "cust-dana".to_string(),
                display_name: "Dana Whitmore".to_string(),
            },
            resources,
            window,
        }
    }

    pub(super) fn build_service(
        vehicles: &[&str],
    ) -> (
        Arc<MemoryService>,
        Arc<InMemoryReservationRepository>,
        Arc<InMemoryEventPublisher>,
    ) {
        let repository = Arc::new(InMemoryReservationRepository::default());
        for id in vehicles {
            repository.register_resource(tenant(), vehicle(id));
        }
        let events = Arc::new(InMemoryEventPublisher::default());
        let service = Arc::new(AdmissionService::new(
            repository.clone(),
            events.clone(),
            AdmissionConfig::default(),
        ));
        (service, repository, events)
    }

    pub(super) fn committed(service: &MemoryService, draft: ReservationDraft) -> Reservation {
        let reservation = match service.commit(draft).expect("commit succeeds") {
            CommitOutcome::Reserved(reservation) => reservation,
            other => panic!("expected granted commit, got {other:?}"),
        };
        match service
            .transition(
                &reservation.tenant,
                &reservation.id,
                ReservationStatus::Confirmed,
                None,
            )
            .expect("confirm succeeds")
        {
            CommitOutcome::Reserved(confirmed) => confirmed,
            other => panic!("expected confirmed reservation, got {other:?}"),
        }
    }
}

mod booking_flow {
    use super::common::*;
    use fleet_ops::workflows::reservations::{CommitOutcome, ReservationStatus, ResourceLinks};

    #[test]
    fn fleet_desk_walkthrough() {
        let (service, _, events) = build_service(&["V99"]);

        // Existing confirmed booking over Thanksgiving week.
        let existing = committed(
            &service,
            draft(
                ResourceLinks::single(vehicle("V99")),
                window("2025-11-20T10:00:00+00:00", "2025-11-27T10:00:00+00:00"),
            ),
        );

        // An overlapping inquiry sees exactly one blocking booking.
        let conflicts = service
            .check_availability(
                &tenant(),
                &vehicle("V99"),
                &window("2025-11-22T10:00:00+00:00", "2025-11-30T10:00:00+00:00"),
                None,
            )
            .expect("availability evaluates");
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id, existing.id);

        // Same-instant turnover is free.
        let boundary = service
            .check_availability(
                &tenant(),
                &vehicle("V99"),
                &window("2025-11-27T10:00:00+00:00", "2025-11-30T10:00:00+00:00"),
                None,
            )
            .expect("availability evaluates");
        assert!(boundary.is_empty());

        // The earlier booking runs its course; the window opens back up.
        for next in [ReservationStatus::Active, ReservationStatus::Completed] {
            service
                .transition(&tenant(), &existing.id, next, None)
                .expect("transition succeeds");
        }
        let reopened = service
            .check_availability(
                &tenant(),
                &vehicle("V99"),
                &window("2025-11-20T10:00:00+00:00", "2025-11-27T10:00:00+00:00"),
                None,
            )
            .expect("availability evaluates");
        assert!(reopened.is_empty());

        // A commit over the vacated week is granted and announced.
        let outcome = service
            .commit(draft(
                ResourceLinks::single(vehicle("V99")),
                window("2025-11-20T10:00:00+00:00", "2025-11-27T10:00:00+00:00"),
            ))
            .expect("commit evaluates");
        assert!(matches!(outcome, CommitOutcome::Reserved(_)));
        assert_eq!(events.events().len(), 2);
    }
}

mod concurrency {
    use std::sync::Barrier;
    use std::thread;

    use super::common::*;
    use fleet_ops::workflows::reservations::{CommitOutcome, ResourceLinks};

    #[test]
    fn racing_overlapping_commits_admit_exactly_one() {
        let (service, _, _) = build_service(&["V99"]);

        let barrier = Barrier::new(2);
        let windows = [
            window("2025-11-20T10:00:00+00:00", "2025-11-27T10:00:00+00:00"),
            window("2025-11-22T10:00:00+00:00", "2025-11-30T10:00:00+00:00"),
        ];

        let outcomes: Vec<CommitOutcome> = thread::scope(|scope| {
            let handles: Vec<_> = windows
                .iter()
                .map(|candidate| {
                    let service = service.clone();
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        service
                            .commit(draft(ResourceLinks::single(vehicle("V99")), *candidate))
                            .expect("commit evaluates")
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("committer thread"))
                .collect()
        });

        let granted = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, CommitOutcome::Reserved(_)))
            .count();
        let denied = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, CommitOutcome::Denied { .. }))
            .count();
        assert_eq!(granted, 1, "exactly one commit may win the window");
        assert_eq!(denied, 1, "the loser observes the conflict");
    }

    #[test]
    fn racing_disjoint_commits_both_succeed() {
        let (service, _, _) = build_service(&["V99"]);

        let barrier = Barrier::new(2);
        let windows = [
            window("2025-11-20T10:00:00+00:00", "2025-11-24T10:00:00+00:00"),
            window("2025-11-24T10:00:00+00:00", "2025-11-28T10:00:00+00:00"),
        ];

        let outcomes: Vec<CommitOutcome> = thread::scope(|scope| {
            let handles: Vec<_> = windows
                .iter()
                .map(|candidate| {
                    let service = service.clone();
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        service
                            .commit(draft(ResourceLinks::single(vehicle("V99")), *candidate))
                            .expect("commit evaluates")
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("committer thread"))
                .collect()
        });

        assert!(outcomes
            .iter()
            .all(|outcome| matches!(outcome, CommitOutcome::Reserved(_))));
    }
}

mod routing {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::common::*;
    use fleet_ops::workflows::reservations::{reservation_router, ResourceLinks};

    #[tokio::test]
    async fn availability_endpoint_reports_the_example_scenario() {
        let (service, _, _) = build_service(&["V99"]);
        committed(
            &service,
            draft(
                ResourceLinks::single(vehicle("V99")),
                window("2025-11-20T10:00:00+00:00", "2025-11-27T10:00:00+00:00"),
            ),
        );
        let router = reservation_router(service);

        let overlapping = Request::builder()
            .method("POST")
            .uri("/api/v1/reservations/availability")
            .header("content-type", "application/json")
            .header("x-tenant-id", tenant().0)
            .body(Body::from(
                serde_json::to_vec(&json!({
                    "resource_id": "V99",
                    "start_date": "2025-11-22T10:00:00+00:00",
                    "end_date": "2025-11-30T10:00:00+00:00",
                }))
                .expect("serialize"),
            ))
            .expect("request");

        let response = router
            .clone()
            .oneshot(overlapping)
            .await
            .expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload.get("available"), Some(&json!(false)));
        assert_eq!(
            payload
                .get("conflicts")
                .and_then(Value::as_array)
                .map(Vec::len),
            Some(1)
        );

        let turnover = Request::builder()
            .method("POST")
            .uri("/api/v1/reservations/availability")
            .header("content-type", "application/json")
            .header("x-tenant-id", tenant().0)
            .body(Body::from(
                serde_json::to_vec(&json!({
                    "resource_id": "V99",
                    "start_date": "2025-11-27T10:00:00+00:00",
                    "end_date": "2025-11-30T10:00:00+00:00",
                }))
                .expect("serialize"),
            ))
            .expect("request");

        let response = router.oneshot(turnover).await.expect("router dispatch");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload.get("available"), Some(&json!(true)));
    }
}
