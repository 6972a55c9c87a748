use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::interval::BookingWindow;

/// Identifier wrapper for tenants; every engine operation is tenant-scoped
/// and resources are never compared across tenants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub String);

/// Identifier wrapper for reservations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReservationId(pub String);

/// Identifier wrapper for reservable fleet resources (vehicles).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Customer snapshot carried on a reservation so conflict reports can name
/// the blocking booking without a customer-service lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRef {
    pub customer_id: String,
    pub display_name: String,
}

/// Lifecycle states a reservation moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Requested,
    Confirmed,
    Active,
    Completed,
    Cancelled,
    Rejected,
}

impl ReservationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Confirmed => "confirmed",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
        }
    }

    /// Whether a reservation in this state still occupies its resources.
    ///
    /// This is the only place holding semantics are defined. Every
    /// availability query filters through it; no call site may keep its own
    /// status list.
    pub const fn holds_resource(self) -> bool {
        matches!(self, Self::Requested | Self::Confirmed | Self::Active)
    }

    /// Terminal states admit no further transitions and freeze the window.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Rejected)
    }
}

/// Resources a reservation occupies: one primary vehicle plus any extras
/// booked alongside it. Conflict rules treat every link identically; the
/// primary/additional split only matters to billing and dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLinks {
    pub primary: ResourceId,
    #[serde(default)]
    pub additional: BTreeSet<ResourceId>,
}

impl ResourceLinks {
    pub fn single(primary: ResourceId) -> Self {
        Self {
            primary,
            additional: BTreeSet::new(),
        }
    }

    pub fn with_additional(
        primary: ResourceId,
        additional: impl IntoIterator<Item = ResourceId>,
    ) -> Self {
        let mut additional: BTreeSet<ResourceId> = additional.into_iter().collect();
        additional.remove(&primary);
        Self {
            primary,
            additional,
        }
    }

    /// Every linked resource, primary first, without duplicates.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceId> {
        std::iter::once(&self.primary).chain(self.additional.iter())
    }

    pub fn to_set(&self) -> BTreeSet<ResourceId> {
        self.iter().cloned().collect()
    }
}

/// A booking occupying its linked resources for a window. Mutated only
/// through the lifecycle state machine; never deleted by this subsystem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub tenant: TenantId,
    pub window: BookingWindow,
    pub status: ReservationStatus,
    pub customer: CustomerRef,
    pub resources: ResourceLinks,
}

/// Everything the booking-creation flow supplies before admission assigns an
/// id and the initial `Requested` status.
#[derive(Debug, Clone)]
pub struct ReservationDraft {
    pub tenant: TenantId,
    pub customer: CustomerRef,
    pub resources: ResourceLinks,
    pub window: BookingWindow,
}
