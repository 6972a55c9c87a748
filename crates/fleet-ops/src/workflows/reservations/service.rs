use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{
    Reservation, ReservationDraft, ReservationId, ReservationStatus, ResourceId, TenantId,
};
use super::evaluator::{AvailabilityError, OverlapEvaluator};
use super::interval::{BookingWindow, WindowError};
use super::lifecycle::{self, LifecycleError};
use super::repository::{
    RepositoryError, ReservationEventPublisher, ReservationGranted, ReservationRepository,
    ResourceClaim,
};

/// Bounded-wait settings for the per-resource serialization boundary.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionConfig {
    /// How long a single claim attempt may wait before reporting busy.
    pub lock_wait: Duration,
    /// Additional claim attempts after a busy result, each preceded by a
    /// short backoff.
    pub lock_retries: u32,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            lock_wait: Duration::from_millis(250),
            lock_retries: 2,
        }
    }
}

/// One blocking reservation on one requested resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceConflict {
    pub resource_id: ResourceId,
    pub reservation: Reservation,
}

/// Decision for an admission request over a resource set: granted only when
/// every requested resource is independently free for the window.
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionResult {
    Granted,
    Denied { conflicts: Vec<ResourceConflict> },
}

/// Outcome of a write-path admission. `Denied` is a normal business result
/// carrying the full conflict list, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Reserved(Reservation),
    Denied { conflicts: Vec<ResourceConflict> },
}

static RESERVATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_reservation_id() -> ReservationId {
    let id = RESERVATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReservationId(format!("res-{id:06}"))
}

/// Orchestrates conflict evaluation across every resource in a booking and
/// owns the transactional check-then-reserve sequence.
pub struct AdmissionService<R, E> {
    repository: Arc<R>,
    events: Arc<E>,
    evaluator: OverlapEvaluator<R>,
    config: AdmissionConfig,
}

impl<R, E> AdmissionService<R, E>
where
    R: ReservationRepository + 'static,
    E: ReservationEventPublisher + 'static,
{
    pub fn new(repository: Arc<R>, events: Arc<E>, config: AdmissionConfig) -> Self {
        let evaluator = OverlapEvaluator::new(repository.clone());
        Self {
            repository,
            events,
            evaluator,
            config,
        }
    }

    /// Availability snapshot for one resource. Lock-free, so the answer can
    /// be stale by the time a write lands; the write paths re-check inside
    /// their claim rather than trusting a prior call.
    pub fn check_availability(
        &self,
        tenant: &TenantId,
        resource: &ResourceId,
        window: &BookingWindow,
        exclude: Option<&ReservationId>,
    ) -> Result<Vec<Reservation>, AdmissionError> {
        Ok(self
            .evaluator
            .find_conflicts(tenant, resource, window, exclude)?)
    }

    /// Conjunction over `resources`: denied when any one of them has a
    /// conflicting holding reservation, enumerating every conflict found so
    /// the caller can report all blocking bookings at once.
    pub fn request_admission(
        &self,
        tenant: &TenantId,
        resources: &BTreeSet<ResourceId>,
        window: &BookingWindow,
        exclude: Option<&ReservationId>,
    ) -> Result<AdmissionResult, AdmissionError> {
        let mut conflicts = Vec::new();
        for resource in resources {
            for reservation in self
                .evaluator
                .find_conflicts(tenant, resource, window, exclude)?
            {
                conflicts.push(ResourceConflict {
                    resource_id: resource.clone(),
                    reservation,
                });
            }
        }

        if conflicts.is_empty() {
            Ok(AdmissionResult::Granted)
        } else {
            Ok(AdmissionResult::Denied { conflicts })
        }
    }

    /// Admission check and reservation insert as one atomic unit under the
    /// repository's resource claim: no window exists where a conflicting
    /// reservation could slip in between check and write.
    pub fn commit(&self, draft: ReservationDraft) -> Result<CommitOutcome, AdmissionError> {
        let resources = draft.resources.to_set();
        let claim = self.claim_resources(&draft.tenant, &resources)?;

        match self.request_admission(&draft.tenant, &resources, &draft.window, None)? {
            AdmissionResult::Denied { conflicts } => {
                debug!(tenant = %draft.tenant, conflicts = conflicts.len(), "admission denied");
                Ok(CommitOutcome::Denied { conflicts })
            }
            AdmissionResult::Granted => {
                let reservation = Reservation {
                    id: next_reservation_id(),
                    tenant: draft.tenant,
                    window: draft.window,
                    status: ReservationStatus::Requested,
                    customer: draft.customer,
                    resources: draft.resources,
                };
                let stored = self.repository.insert(reservation)?;
                drop(claim);

                info!(reservation = %stored.id, window = %stored.window, "reservation admitted");
                self.emit_granted(&stored);
                Ok(CommitOutcome::Reserved(stored))
            }
        }
    }

    /// Moves an existing reservation to a new window, leaving the stored
    /// window untouched when the new one is denied.
    pub fn reschedule(
        &self,
        tenant: &TenantId,
        id: &ReservationId,
        window: BookingWindow,
    ) -> Result<CommitOutcome, AdmissionError> {
        let mut reservation = self.fetch_reservation(tenant, id)?;
        lifecycle::ensure_window_mutable(reservation.status)?;

        let resources = reservation.resources.to_set();
        let claim = self.claim_resources(tenant, &resources)?;

        match self.request_admission(tenant, &resources, &window, Some(id))? {
            AdmissionResult::Denied { conflicts } => Ok(CommitOutcome::Denied { conflicts }),
            AdmissionResult::Granted => {
                reservation.window = window;
                self.repository.update(reservation.clone())?;
                drop(claim);

                info!(reservation = %reservation.id, window = %reservation.window, "reservation rescheduled");
                self.emit_granted(&reservation);
                Ok(CommitOutcome::Reserved(reservation))
            }
        }
    }

    /// Applies a lifecycle move. A transition that also sets a new window
    /// and lands in a holding state is re-admitted first (self-excluded,
    /// under the claim); moves into released states never consult conflicts
    /// and never take the boundary, so releasing a vehicle cannot block.
    pub fn transition(
        &self,
        tenant: &TenantId,
        id: &ReservationId,
        next: ReservationStatus,
        window: Option<BookingWindow>,
    ) -> Result<CommitOutcome, AdmissionError> {
        let mut reservation = self.fetch_reservation(tenant, id)?;
        lifecycle::ensure_transition(reservation.status, next)?;

        match window {
            None => {
                reservation.status = next;
                self.repository.update(reservation.clone())?;
                debug!(reservation = %reservation.id, status = next.label(), "lifecycle transition");
                Ok(CommitOutcome::Reserved(reservation))
            }
            Some(window) if next.holds_resource() => {
                let resources = reservation.resources.to_set();
                let claim = self.claim_resources(tenant, &resources)?;

                match self.request_admission(tenant, &resources, &window, Some(id))? {
                    AdmissionResult::Denied { conflicts } => {
                        Ok(CommitOutcome::Denied { conflicts })
                    }
                    AdmissionResult::Granted => {
                        reservation.status = next;
                        reservation.window = window;
                        self.repository.update(reservation.clone())?;
                        drop(claim);

                        info!(reservation = %reservation.id, status = next.label(), "transition re-admitted");
                        self.emit_granted(&reservation);
                        Ok(CommitOutcome::Reserved(reservation))
                    }
                }
            }
            Some(_) => Err(AdmissionError::Lifecycle(LifecycleError::WindowLocked {
                status: next,
            })),
        }
    }

    /// Fetches a reservation for API responses.
    pub fn get(
        &self,
        tenant: &TenantId,
        id: &ReservationId,
    ) -> Result<Reservation, AdmissionError> {
        self.fetch_reservation(tenant, id)
    }

    fn fetch_reservation(
        &self,
        tenant: &TenantId,
        id: &ReservationId,
    ) -> Result<Reservation, AdmissionError> {
        self.repository
            .fetch(tenant, id)?
            .ok_or_else(|| AdmissionError::UnknownReservation(id.clone()))
    }

    fn claim_resources(
        &self,
        tenant: &TenantId,
        resources: &BTreeSet<ResourceId>,
    ) -> Result<Box<dyn ResourceClaim>, AdmissionError> {
        let mut attempt = 0;
        loop {
            match self
                .repository
                .lock_resources(tenant, resources, self.config.lock_wait)
            {
                Ok(claim) => return Ok(claim),
                Err(RepositoryError::Busy) if attempt < self.config.lock_retries => {
                    attempt += 1;
                    warn!(attempt, "resource claim busy, backing off");
                    thread::sleep(Duration::from_millis(10 * u64::from(attempt)));
                }
                Err(RepositoryError::Busy) => return Err(AdmissionError::Busy),
                Err(other) => return Err(other.into()),
            }
        }
    }

    fn emit_granted(&self, reservation: &Reservation) {
        let event = ReservationGranted {
            reservation_id: reservation.id.clone(),
            resource_ids: reservation.resources.iter().cloned().collect(),
            window: reservation.window,
        };
        if let Err(err) = self.events.publish(event) {
            warn!(reservation = %reservation.id, error = %err, "granted event dropped");
        }
    }
}

/// Error raised by the admission service. `Denied` outcomes are values, not
/// errors; everything here either rejects a request up front or reports an
/// infrastructure failure.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Availability(#[from] AvailabilityError),
    #[error("unknown reservation '{0}'")]
    UnknownReservation(ReservationId),
    #[error("resources are claimed by another booking in progress")]
    Busy,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
