use crate::infra::demo_tenant;
use chrono::{DateTime, Utc};
use clap::Args;
use fleet_ops::error::AppError;
use fleet_ops::workflows::reservations::{
    AdmissionConfig, AdmissionService, BookingWindow, CommitOutcome, CustomerRef,
    InMemoryEventPublisher, InMemoryReservationRepository, ReservationDraft, ReservationStatus,
    ResourceId, ResourceLinks,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Vehicle id used throughout the walkthrough
    #[arg(long, default_value = "V99")]
    pub(crate) vehicle: String,
}

fn instant(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("demo timestamps are valid")
        .with_timezone(&Utc)
}

fn demo_window(start: &str, end: &str) -> BookingWindow {
    BookingWindow::new(instant(start), instant(end)).expect("demo windows are valid")
}

fn describe(outcome: &CommitOutcome) -> String {
    match outcome {
        CommitOutcome::Reserved(reservation) => format!(
            "granted as {} ({})",
            reservation.id,
            reservation.status.label()
        ),
        CommitOutcome::Denied { conflicts } => format!(
            "denied by {} conflicting booking(s): {}",
            conflicts.len(),
            conflicts
                .iter()
                .map(|conflict| format!(
                    "{} on {} {}",
                    conflict.reservation.id, conflict.resource_id, conflict.reservation.window
                ))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let tenant = demo_tenant();
    let vehicle = ResourceId(args.vehicle);

    let repository = Arc::new(InMemoryReservationRepository::default());
    repository.register_resource(tenant.clone(), vehicle.clone());
    let events = Arc::new(InMemoryEventPublisher::default());
    let service = AdmissionService::new(
        repository,
        events.clone(),
        AdmissionConfig::default(),
    );

    println!("Reservation admission walkthrough for vehicle {vehicle}");

    let first_window = demo_window("2025-11-20T10:00:00+00:00", "2025-11-27T10:00:00+00:00");
    let outcome = service
        .commit(ReservationDraft {
            tenant: tenant.clone(),
            customer: CustomerRef {
                customer_id: "cust-dana".to_string(),
                display_name: "Dana Whitmore".to_string(),
            },
            resources: ResourceLinks::single(vehicle.clone()),
            window: first_window,
        })?;
    println!("1. Dana books {first_window}: {}", describe(&outcome));

    let first = match outcome {
        CommitOutcome::Reserved(reservation) => reservation,
        CommitOutcome::Denied { .. } => unreachable!("empty calendar cannot deny"),
    };
    service.transition(&tenant, &first.id, ReservationStatus::Confirmed, None)?;
    println!("2. Dana's booking is confirmed");

    let overlapping = demo_window("2025-11-22T10:00:00+00:00", "2025-11-30T10:00:00+00:00");
    let conflicts = service.check_availability(&tenant, &vehicle, &overlapping, None)?;
    println!(
        "3. Availability for {overlapping}: {}",
        if conflicts.is_empty() {
            "free".to_string()
        } else {
            format!("blocked by {} booking(s)", conflicts.len())
        }
    );

    let outcome = service
        .commit(ReservationDraft {
            tenant: tenant.clone(),
            customer: CustomerRef {
                customer_id: "cust-arturo".to_string(),
                display_name: "Arturo Vega".to_string(),
            },
            resources: ResourceLinks::single(vehicle.clone()),
            window: overlapping,
        })?;
    println!("4. Arturo tries the same week anyway: {}", describe(&outcome));

    let turnover = demo_window("2025-11-27T10:00:00+00:00", "2025-11-30T10:00:00+00:00");
    let outcome = service
        .commit(ReservationDraft {
            tenant: tenant.clone(),
            customer: CustomerRef {
                customer_id: "cust-arturo".to_string(),
                display_name: "Arturo Vega".to_string(),
            },
            resources: ResourceLinks::single(vehicle.clone()),
            window: turnover,
        })?;
    println!("5. Arturo takes the turnover slot {turnover}: {}", describe(&outcome));

    for next in [ReservationStatus::Active, ReservationStatus::Completed] {
        service.transition(&tenant, &first.id, next, None)?;
    }
    let reopened = service.check_availability(&tenant, &vehicle, &first_window, None)?;
    println!(
        "6. Dana returns the vehicle; her week is now {}",
        if reopened.is_empty() { "free again" } else { "still blocked" }
    );

    println!(
        "7. Granted events emitted for downstream collaborators: {}",
        events.events().len()
    );

    Ok(())
}
