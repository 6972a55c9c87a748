//! Availability and conflict detection for fleet reservations.
//!
//! A reservation occupies one or more vehicles for a half-open time window.
//! Admission decides whether a requested window can be granted without
//! overlapping any holding reservation on the same resources, and the
//! commit path performs that check and the insert as one atomic unit so
//! concurrent requests cannot double-book a vehicle.

pub mod domain;
pub mod evaluator;
pub mod interval;
pub mod lifecycle;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    CustomerRef, Reservation, ReservationDraft, ReservationId, ReservationStatus, ResourceId,
    ResourceLinks, TenantId,
};
pub use evaluator::{AvailabilityError, OverlapEvaluator};
pub use interval::{BookingWindow, WindowError};
pub use lifecycle::LifecycleError;
pub use memory::{InMemoryEventPublisher, InMemoryReservationRepository};
pub use repository::{
    EventError, RepositoryError, ReservationEventPublisher, ReservationGranted,
    ReservationRepository, ResourceClaim,
};
pub use router::{reservation_router, tenant_from_headers};
pub use service::{
    AdmissionConfig, AdmissionError, AdmissionResult, AdmissionService, CommitOutcome,
    ResourceConflict,
};
