use std::collections::BTreeSet;
use std::time::Duration;

use serde::Serialize;

use super::domain::{Reservation, ReservationId, ResourceId, TenantId};
use super::interval::BookingWindow;

/// Storage abstraction over persisted reservations and their resource links.
///
/// The engine holds no connection of its own; a concrete implementation is
/// injected into the admission service. Implementations are expected to back
/// `holding_for_resource` with a (tenant, resource, status) index so the
/// lookup is selective in the number of holding reservations rather than a
/// table scan.
pub trait ReservationRepository: Send + Sync {
    /// Reservations linked to `resource` whose status holds the resource per
    /// [`ReservationStatus::holds_resource`], excluding `exclude` when given.
    ///
    /// [`ReservationStatus::holds_resource`]: super::domain::ReservationStatus::holds_resource
    fn holding_for_resource(
        &self,
        tenant: &TenantId,
        resource: &ResourceId,
        exclude: Option<&ReservationId>,
    ) -> Result<Vec<Reservation>, RepositoryError>;

    /// Whether `resource` is registered for `tenant`.
    fn resource_exists(
        &self,
        tenant: &TenantId,
        resource: &ResourceId,
    ) -> Result<bool, RepositoryError>;

    fn insert(&self, reservation: Reservation) -> Result<Reservation, RepositoryError>;

    fn fetch(
        &self,
        tenant: &TenantId,
        id: &ReservationId,
    ) -> Result<Option<Reservation>, RepositoryError>;

    fn update(&self, reservation: Reservation) -> Result<(), RepositoryError>;

    /// Serialization boundary for check-then-write sequences. Excludes other
    /// writers touching any of `resources` until the returned claim is
    /// dropped, and gives up with [`RepositoryError::Busy`] once `wait`
    /// elapses so no caller blocks indefinitely. The scope is the given
    /// resource set only; unrelated bookings are not serialized against it.
    fn lock_resources(
        &self,
        tenant: &TenantId,
        resources: &BTreeSet<ResourceId>,
        wait: Duration,
    ) -> Result<Box<dyn ResourceClaim>, RepositoryError>;
}

/// RAII handle for a held resource claim; dropping it releases the boundary.
pub trait ResourceClaim: Send {}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("resource claim is held by another writer")]
    Busy,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Domain event emitted once an admission decision has been persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReservationGranted {
    pub reservation_id: ReservationId,
    pub resource_ids: Vec<ResourceId>,
    pub window: BookingWindow,
}

/// Outbound hook consumed by notification and contract-generation
/// collaborators. Fired after a successful commit; the engine never waits on
/// downstream completion.
pub trait ReservationEventPublisher: Send + Sync {
    fn publish(&self, event: ReservationGranted) -> Result<(), EventError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}
