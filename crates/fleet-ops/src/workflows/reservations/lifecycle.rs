use super::domain::ReservationStatus;

/// Legal lifecycle moves: `requested → confirmed → active → completed`, with
/// `requested → rejected` and `{requested, confirmed} → cancelled` as side
/// branches. Everything else is rejected before any state is touched.
const fn allowed(from: ReservationStatus, to: ReservationStatus) -> bool {
    use ReservationStatus::*;
    matches!(
        (from, to),
        (Requested, Confirmed)
            | (Confirmed, Active)
            | (Active, Completed)
            | (Requested, Rejected)
            | (Requested, Cancelled)
            | (Confirmed, Cancelled)
    )
}

pub fn ensure_transition(
    from: ReservationStatus,
    to: ReservationStatus,
) -> Result<(), LifecycleError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition { from, to })
    }
}

/// Window edits are rejected once a reservation has reached a terminal
/// state; the lifecycle record may still be read, but its dates are frozen.
pub fn ensure_window_mutable(status: ReservationStatus) -> Result<(), LifecycleError> {
    if status.is_terminal() {
        Err(LifecycleError::WindowLocked { status })
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("cannot move a {} reservation to {}", from.label(), to.label())]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },
    #[error("a {} reservation can no longer change its window", status.label())]
    WindowLocked { status: ReservationStatus },
}
