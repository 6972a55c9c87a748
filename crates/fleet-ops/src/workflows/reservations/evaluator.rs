use std::sync::Arc;

use super::domain::{Reservation, ReservationId, ResourceId, TenantId};
use super::interval::BookingWindow;
use super::repository::{RepositoryError, ReservationRepository};

/// Applies the half-open overlap predicate to the holding reservations of a
/// single resource.
///
/// An empty result is the sole authoritative "free" signal; no status flag
/// on the resource itself is consulted for time-based availability.
pub struct OverlapEvaluator<R> {
    repository: Arc<R>,
}

impl<R: ReservationRepository> OverlapEvaluator<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Holding reservations on `resource` whose window overlaps `window`.
    ///
    /// `exclude` is honored when re-checking an existing reservation being
    /// edited so it never conflicts with itself. Unknown resources are an
    /// error, not an empty result: "free" must never be conflated with
    /// "no such vehicle".
    pub fn find_conflicts(
        &self,
        tenant: &TenantId,
        resource: &ResourceId,
        window: &BookingWindow,
        exclude: Option<&ReservationId>,
    ) -> Result<Vec<Reservation>, AvailabilityError> {
        if !self.repository.resource_exists(tenant, resource)? {
            return Err(AvailabilityError::UnknownResource(resource.clone()));
        }

        let holding = self
            .repository
            .holding_for_resource(tenant, resource, exclude)?;

        Ok(holding
            .into_iter()
            .filter(|reservation| reservation.window.overlaps(window))
            .collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AvailabilityError {
    #[error("unknown resource '{0}'")]
    UnknownResource(ResourceId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
