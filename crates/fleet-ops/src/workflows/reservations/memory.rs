//! In-memory reference infrastructure. The demo server and tests run on
//! these; a production deployment swaps in a SQL-backed repository behind
//! the same traits and maps the resource claim onto row locking.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use super::domain::{Reservation, ReservationId, ResourceId, TenantId};
use super::repository::{
    EventError, RepositoryError, ReservationEventPublisher, ReservationGranted,
    ReservationRepository, ResourceClaim,
};

/// Lock table guarding per-tenant resource sets. Acquisition is
/// all-or-nothing: a writer either claims every requested resource at once
/// or waits, so two racing commits over the same vehicle serialize while
/// unrelated bookings proceed, and partial claims can never deadlock.
#[derive(Default)]
struct ClaimTable {
    held: Mutex<HashSet<(TenantId, ResourceId)>>,
    released: Condvar,
}

impl ClaimTable {
    fn acquire(
        table: &Arc<Self>,
        tenant: &TenantId,
        resources: &BTreeSet<ResourceId>,
        wait: Duration,
    ) -> Result<MemoryClaim, RepositoryError> {
        let keys: Vec<(TenantId, ResourceId)> = resources
            .iter()
            .map(|resource| (tenant.clone(), resource.clone()))
            .collect();

        let deadline = Instant::now() + wait;
        let mut held = table.held.lock().expect("claim table mutex poisoned");
        loop {
            if keys.iter().all(|key| !held.contains(key)) {
                held.extend(keys.iter().cloned());
                return Ok(MemoryClaim {
                    table: Arc::clone(table),
                    keys,
                });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(RepositoryError::Busy);
            }
            let (guard, _) = table
                .released
                .wait_timeout(held, remaining)
                .expect("claim table mutex poisoned");
            held = guard;
        }
    }

    fn release(&self, keys: &[(TenantId, ResourceId)]) {
        let mut held = self.held.lock().expect("claim table mutex poisoned");
        for key in keys {
            held.remove(key);
        }
        drop(held);
        self.released.notify_all();
    }
}

struct MemoryClaim {
    table: Arc<ClaimTable>,
    keys: Vec<(TenantId, ResourceId)>,
}

impl ResourceClaim for MemoryClaim {}

impl Drop for MemoryClaim {
    fn drop(&mut self) {
        self.table.release(&self.keys);
    }
}

/// HashMap-backed repository with the claim table above as its
/// serialization boundary.
#[derive(Default, Clone)]
pub struct InMemoryReservationRepository {
    records: Arc<Mutex<HashMap<ReservationId, Reservation>>>,
    resources: Arc<Mutex<HashSet<(TenantId, ResourceId)>>>,
    claims: Arc<ClaimTable>,
}

impl InMemoryReservationRepository {
    /// Registers a reservable vehicle for a tenant. In production the fleet
    /// inventory feeds this; here callers seed it directly.
    pub fn register_resource(&self, tenant: TenantId, resource: ResourceId) {
        self.resources
            .lock()
            .expect("resource registry mutex poisoned")
            .insert((tenant, resource));
    }
}

impl ReservationRepository for InMemoryReservationRepository {
    fn holding_for_resource(
        &self,
        tenant: &TenantId,
        resource: &ResourceId,
        exclude: Option<&ReservationId>,
    ) -> Result<Vec<Reservation>, RepositoryError> {
        let records = self.records.lock().expect("repository mutex poisoned");
        Ok(records
            .values()
            .filter(|reservation| reservation.tenant == *tenant)
            .filter(|reservation| reservation.status.holds_resource())
            .filter(|reservation| reservation.resources.iter().any(|linked| linked == resource))
            .filter(|reservation| exclude != Some(&reservation.id))
            .cloned()
            .collect())
    }

    fn resource_exists(
        &self,
        tenant: &TenantId,
        resource: &ResourceId,
    ) -> Result<bool, RepositoryError> {
        let resources = self
            .resources
            .lock()
            .expect("resource registry mutex poisoned");
        Ok(resources.contains(&(tenant.clone(), resource.clone())))
    }

    fn insert(&self, reservation: Reservation) -> Result<Reservation, RepositoryError> {
        let mut records = self.records.lock().expect("repository mutex poisoned");
        if records.contains_key(&reservation.id) {
            return Err(RepositoryError::Conflict);
        }
        records.insert(reservation.id.clone(), reservation.clone());
        Ok(reservation)
    }

    fn fetch(
        &self,
        tenant: &TenantId,
        id: &ReservationId,
    ) -> Result<Option<Reservation>, RepositoryError> {
        let records = self.records.lock().expect("repository mutex poisoned");
        Ok(records
            .get(id)
            .filter(|reservation| reservation.tenant == *tenant)
            .cloned())
    }

    fn update(&self, reservation: Reservation) -> Result<(), RepositoryError> {
        let mut records = self.records.lock().expect("repository mutex poisoned");
        match records.get(&reservation.id) {
            Some(existing) if existing.tenant == reservation.tenant => {
                records.insert(reservation.id.clone(), reservation);
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }

    fn lock_resources(
        &self,
        tenant: &TenantId,
        resources: &BTreeSet<ResourceId>,
        wait: Duration,
    ) -> Result<Box<dyn ResourceClaim>, RepositoryError> {
        let claim = ClaimTable::acquire(&self.claims, tenant, resources, wait)?;
        Ok(Box::new(claim))
    }
}

/// Event sink collecting granted events so demos and tests can assert the
/// notification hook fired.
#[derive(Default, Clone)]
pub struct InMemoryEventPublisher {
    events: Arc<Mutex<Vec<ReservationGranted>>>,
}

impl InMemoryEventPublisher {
    pub fn events(&self) -> Vec<ReservationGranted> {
        self.events.lock().expect("event sink mutex poisoned").clone()
    }
}

impl ReservationEventPublisher for InMemoryEventPublisher {
    fn publish(&self, event: ReservationGranted) -> Result<(), EventError> {
        self.events
            .lock()
            .expect("event sink mutex poisoned")
            .push(event);
        Ok(())
    }
}
