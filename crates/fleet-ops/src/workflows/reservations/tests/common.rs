use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::workflows::reservations::domain::{
    CustomerRef, Reservation, ReservationDraft, ReservationStatus, ResourceId, ResourceLinks,
    TenantId,
};
use crate::workflows::reservations::interval::BookingWindow;
use crate::workflows::reservations::memory::{
    InMemoryEventPublisher, InMemoryReservationRepository,
};
use crate::workflows::reservations::repository::{
    EventError, ReservationEventPublisher, ReservationGranted,
};
use crate::workflows::reservations::service::{AdmissionConfig, AdmissionService, CommitOutcome};

pub(super) type MemoryService =
    AdmissionService<InMemoryReservationRepository, InMemoryEventPublisher>;

pub(super) fn tenant() -> TenantId {
    TenantId("acme-rentals".to_string())
}

pub(super) fn other_tenant() -> TenantId {
    TenantId("harbor-rentals".to_string())
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

pub(super) fn customer(name: &str) -> CustomerRef {
    CustomerRef {
        customer_id: format!("cust-{}", name.to_ascii_lowercase().replace(' ', "-")),
        display_name: name.to_string(),
    }
}

pub(super) fn draft(resources: ResourceLinks, window: BookingWindow) -> ReservationDraft {
    ReservationDraft {
        tenant: tenant(),
        customer: customer("Dana Whitmore"),
        resources,
        window,
    }
}

pub(super) fn build_service(
    vehicles: &[&str],
) -> (
    MemoryService,
    Arc<InMemoryReservationRepository>,
    Arc<InMemoryEventPublisher>,
) {
    build_service_with_config(vehicles, AdmissionConfig::default())
}

pub(super) fn build_service_with_config(
    vehicles: &[&str],
    config: AdmissionConfig,
) -> (
    MemoryService,
    Arc<InMemoryReservationRepository>,
    Arc<InMemoryEventPublisher>,
) {
    let repository = Arc::new(InMemoryReservationRepository::default());
    for id in vehicles {
        repository.register_resource(tenant(), vehicle(id));
    }
    let events = Arc::new(InMemoryEventPublisher::default());
    let service = AdmissionService::new(repository.clone(), events.clone(), config);
    (service, repository, events)
}

/// Commits a draft and confirms it so the booking sits in a holding state a
/// customer would actually see.
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

pub(super) struct FailingPublisher;

impl ReservationEventPublisher for FailingPublisher {
    fn publish(&self, _event: ReservationGranted) -> Result<(), EventError> {
        Err(EventError::Transport("notification bus offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
