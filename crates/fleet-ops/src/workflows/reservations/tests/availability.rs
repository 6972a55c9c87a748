use std::sync::Arc;

use super::common::*;
use crate::workflows::reservations::domain::{ReservationStatus, ResourceLinks};
use crate::workflows::reservations::evaluator::{AvailabilityError, OverlapEvaluator};
use crate::workflows::reservations::memory::InMemoryReservationRepository;

fn evaluator(
    repository: &Arc<InMemoryReservationRepository>,
) -> OverlapEvaluator<InMemoryReservationRepository> {
    OverlapEvaluator::new(repository.clone())
}

#[test]
fn unknown_vehicle_is_an_error_not_an_empty_result() {
    let (_, repository, _) = build_service(&["V1"]);

    let result = evaluator(&repository).find_conflicts(
        &tenant(),
        &vehicle("V404"),
        &window("2025-11-20T10:00:00+00:00", "2025-11-27T10:00:00+00:00"),
        None,
    );

    assert!(matches!(
        result,
        Err(AvailabilityError::UnknownResource(resource)) if resource == vehicle("V404")
    ));
}

#[test]
fn conflicts_name_the_blocking_reservation() {
    let (service, repository, _) = build_service(&["V99"]);
    let existing = committed(
        &service,
        draft(
            ResourceLinks::single(vehicle("V99")),
            window("2025-11-20T10:00:00+00:00", "2025-11-27T10:00:00+00:00"),
        ),
    );

    let conflicts = evaluator(&repository)
        .find_conflicts(
            &tenant(),
            &vehicle("V99"),
            &window("2025-11-22T10:00:00+00:00", "2025-11-30T10:00:00+00:00"),
            None,
        )
        .expect("lookup succeeds");

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].id, existing.id);
}

#[test]
fn released_reservations_do_not_block() {
    let (service, repository, _) = build_service(&["V1"]);
    let booking_window = window("2025-11-20T10:00:00+00:00", "2025-11-27T10:00:00+00:00");
    let reservation = committed(
        &service,
        draft(ResourceLinks::single(vehicle("V1")), booking_window),
    );

    for next in [ReservationStatus::Active, ReservationStatus::Completed] {
        service
            .transition(&tenant(), &reservation.id, next, None)
            .expect("transition succeeds");
    }

    let conflicts = evaluator(&repository)
        .find_conflicts(&tenant(), &vehicle("V1"), &booking_window, None)
        .expect("lookup succeeds");
    assert!(conflicts.is_empty());
}

#[test]
fn cancelled_requests_free_the_window_immediately() {
    let (service, repository, _) = build_service(&["V1"]);
    let booking_window = window("2025-11-20T10:00:00+00:00", "2025-11-27T10:00:00+00:00");
    let reservation = committed(
        &service,
        draft(ResourceLinks::single(vehicle("V1")), booking_window),
    );

    let before = evaluator(&repository)
        .find_conflicts(&tenant(), &vehicle("V1"), &booking_window, None)
        .expect("lookup succeeds");
    assert_eq!(before.len(), 1);

    service
        .transition(
            &tenant(),
            &reservation.id,
            ReservationStatus::Cancelled,
            None,
        )
        .expect("cancel succeeds");

    let after = evaluator(&repository)
        .find_conflicts(&tenant(), &vehicle("V1"), &booking_window, None)
        .expect("lookup succeeds");
    assert!(after.is_empty());
}

#[test]
fn exclusion_never_reports_the_reservation_itself() {
    let (service, repository, _) = build_service(&["V1"]);
    let reservation = committed(
        &service,
        draft(
            ResourceLinks::single(vehicle("V1")),
            window("2025-11-20T10:00:00+00:00", "2025-11-27T10:00:00+00:00"),
        ),
    );

    // The candidate fully overlaps the reservation's own window.
    let conflicts = evaluator(&repository)
        .find_conflicts(
            &tenant(),
            &vehicle("V1"),
            &window("2025-11-19T10:00:00+00:00", "2025-11-28T10:00:00+00:00"),
            Some(&reservation.id),
        )
        .expect("lookup succeeds");

    assert!(conflicts.is_empty());
}

#[test]
fn tenants_are_isolated() {
    let (service, repository, _) = build_service(&["V1"]);
    repository.register_resource(other_tenant(), vehicle("V1"));

    let booking_window = window("2025-11-20T10:00:00+00:00", "2025-11-27T10:00:00+00:00");
    committed(
        &service,
        draft(ResourceLinks::single(vehicle("V1")), booking_window),
    );

    let conflicts = evaluator(&repository)
        .find_conflicts(&other_tenant(), &vehicle("V1"), &booking_window, None)
        .expect("lookup succeeds");
    assert!(conflicts.is_empty());
}
