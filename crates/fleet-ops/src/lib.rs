//! Reservation admission engine for a vehicle rental fleet.
//!
//! The engine answers one question: can a requested time window for a set of
//! vehicles be granted without conflicting with existing reservations? It
//! owns interval arithmetic, the holding-status policy, the reservation
//! lifecycle, and the transactional check-then-reserve sequence. Everything
//! around it (persistence, notifications, tenant resolution) is reached
//! through injected traits.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
