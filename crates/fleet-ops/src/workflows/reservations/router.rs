use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    CustomerRef, Reservation, ReservationDraft, ReservationId, ReservationStatus, ResourceId,
    ResourceLinks, TenantId,
};
use super::evaluator::AvailabilityError;
use super::interval::BookingWindow;
use super::repository::{ReservationEventPublisher, ReservationRepository};
use super::service::{AdmissionError, AdmissionService, CommitOutcome, ResourceConflict};

/// Router builder exposing the availability check and the booking-creation
/// collaborator endpoints.
pub fn reservation_router<R, E>(service: Arc<AdmissionService<R, E>>) -> Router
where
    R: ReservationRepository + 'static,
    E: ReservationEventPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/reservations/availability",
            post(availability_handler::<R, E>),
        )
        .route("/api/v1/reservations", post(create_handler::<R, E>))
        .route(
            "/api/v1/reservations/:reservation_id",
            get(fetch_handler::<R, E>),
        )
        .route(
            "/api/v1/reservations/:reservation_id/transitions",
            post(transition_handler::<R, E>),
        )
        .route(
            "/api/v1/reservations/:reservation_id/reschedule",
            post(reschedule_handler::<R, E>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub resource_id: String,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    #[serde(default)]
    pub exclude_reservation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
    pub conflicts: Vec<ConflictView>,
}

/// Conflict entry naming the blocking booking.
#[derive(Debug, Serialize)]
pub struct ConflictView {
    pub reservation_id: ReservationId,
    pub customer_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl ConflictView {
    fn from_reservation(reservation: &Reservation) -> Self {
        Self {
            reservation_id: reservation.id.clone(),
            customer_name: reservation.customer.display_name.clone(),
            start_date: reservation.window.start(),
            end_date: reservation.window.end(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResourceConflictView {
    pub resource_id: ResourceId,
    pub reservation_id: ReservationId,
    pub customer_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl ResourceConflictView {
    fn from_conflict(conflict: &ResourceConflict) -> Self {
        Self {
            resource_id: conflict.resource_id.clone(),
            reservation_id: conflict.reservation.id.clone(),
            customer_name: conflict.reservation.customer.display_name.clone(),
            start_date: conflict.reservation.window.start(),
            end_date: conflict.reservation.window.end(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub customer_id: String,
    pub customer_name: String,
    pub resource_id: String,
    #[serde(default)]
    pub additional_resource_ids: Vec<String>,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: ReservationStatus,
    #[serde(default)]
    pub start_date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub end_date: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
}

/// Sanitized reservation representation for API responses.
#[derive(Debug, Serialize)]
pub struct ReservationView {
    pub reservation_id: ReservationId,
    pub status: &'static str,
    pub customer_name: String,
    pub resource_ids: Vec<ResourceId>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl ReservationView {
    fn from_reservation(reservation: &Reservation) -> Self {
        Self {
            reservation_id: reservation.id.clone(),
            status: reservation.status.label(),
            customer_name: reservation.customer.display_name.clone(),
            resource_ids: reservation.resources.iter().cloned().collect(),
            start_date: reservation.window.start(),
            end_date: reservation.window.end(),
        }
    }
}

pub(crate) async fn availability_handler<R, E>(
    State(service): State<Arc<AdmissionService<R, E>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<AvailabilityRequest>,
) -> Response
where
    R: ReservationRepository + 'static,
    E: ReservationEventPublisher + 'static,
{
    let tenant = match tenant_from_headers(&headers) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };
    let window = match window_from_bounds(request.start_date, request.end_date) {
        Ok(window) => window,
        Err(error) => return error_response(error),
    };

    let resource = ResourceId(request.resource_id);
    let exclude = request.exclude_reservation_id.map(ReservationId);

    match service.check_availability(&tenant, &resource, &window, exclude.as_ref()) {
        Ok(conflicts) => {
            let body = AvailabilityResponse {
                available: conflicts.is_empty(),
                conflicts: conflicts.iter().map(ConflictView::from_reservation).collect(),
            };
            (StatusCode::OK, axum::Json(body)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_handler<R, E>(
    State(service): State<Arc<AdmissionService<R, E>>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<CreateReservationRequest>,
) -> Response
where
    R: ReservationRepository + 'static,
    E: ReservationEventPublisher + 'static,
{
    let tenant = match tenant_from_headers(&headers) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };
    let window = match window_from_bounds(request.start_date, request.end_date) {
        Ok(window) => window,
        Err(error) => return error_response(error),
    };

    let draft = ReservationDraft {
        tenant,
        customer: CustomerRef {
            customer_id: request.customer_id,
            display_name: request.customer_name,
        },
        resources: ResourceLinks::with_additional(
            ResourceId(request.resource_id),
            request.additional_resource_ids.into_iter().map(ResourceId),
        ),
        window,
    };

    match service.commit(draft) {
        Ok(CommitOutcome::Reserved(reservation)) => (
            StatusCode::CREATED,
            axum::Json(ReservationView::from_reservation(&reservation)),
        )
            .into_response(),
        Ok(CommitOutcome::Denied { conflicts }) => denied_response(&conflicts),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn fetch_handler<R, E>(
    State(service): State<Arc<AdmissionService<R, E>>>,
    headers: HeaderMap,
    Path(reservation_id): Path<String>,
) -> Response
where
    R: ReservationRepository + 'static,
    E: ReservationEventPublisher + 'static,
{
    let tenant = match tenant_from_headers(&headers) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };

    match service.get(&tenant, &ReservationId(reservation_id)) {
        Ok(reservation) => (
            StatusCode::OK,
            axum::Json(ReservationView::from_reservation(&reservation)),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn transition_handler<R, E>(
    State(service): State<Arc<AdmissionService<R, E>>>,
    headers: HeaderMap,
    Path(reservation_id): Path<String>,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response
where
    R: ReservationRepository + 'static,
    E: ReservationEventPublisher + 'static,
{
    let tenant = match tenant_from_headers(&headers) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };

    let window = match (request.start_date, request.end_date) {
        (None, None) => None,
        (Some(start), Some(end)) => match window_from_bounds(start, end) {
            Ok(window) => Some(window),
            Err(error) => return error_response(error),
        },
        _ => {
            let payload = json!({
                "error": "start_date and end_date must be provided together",
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };

    match service.transition(&tenant, &ReservationId(reservation_id), request.status, window) {
        Ok(CommitOutcome::Reserved(reservation)) => (
            StatusCode::OK,
            axum::Json(ReservationView::from_reservation(&reservation)),
        )
            .into_response(),
        Ok(CommitOutcome::Denied { conflicts }) => denied_response(&conflicts),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reschedule_handler<R, E>(
    State(service): State<Arc<AdmissionService<R, E>>>,
    headers: HeaderMap,
    Path(reservation_id): Path<String>,
    axum::Json(request): axum::Json<RescheduleRequest>,
) -> Response
where
    R: ReservationRepository + 'static,
    E: ReservationEventPublisher + 'static,
{
    let tenant = match tenant_from_headers(&headers) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };
    let window = match window_from_bounds(request.start_date, request.end_date) {
        Ok(window) => window,
        Err(error) => return error_response(error),
    };

    match service.reschedule(&tenant, &ReservationId(reservation_id), window) {
        Ok(CommitOutcome::Reserved(reservation)) => (
            StatusCode::OK,
            axum::Json(ReservationView::from_reservation(&reservation)),
        )
            .into_response(),
        Ok(CommitOutcome::Denied { conflicts }) => denied_response(&conflicts),
        Err(error) => error_response(error),
    }
}

/// Tenant resolution itself is an upstream concern; by the time a request
/// reaches the engine the tenant is expected in the `x-tenant-id` header.
/// Callers mounting extra routes next to [`reservation_router`] use this
/// same helper so the header contract cannot drift between endpoints.
pub fn tenant_from_headers(headers: &HeaderMap) -> Result<TenantId, Response> {
    headers
        .get("x-tenant-id")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(|value| TenantId(value.to_string()))
        .ok_or_else(|| {
            let payload = json!({ "error": "missing x-tenant-id header" });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        })
}

fn window_from_bounds(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> Result<BookingWindow, AdmissionError> {
    Ok(BookingWindow::new(
        start.with_timezone(&Utc),
        end.with_timezone(&Utc),
    )?)
}

fn denied_response(conflicts: &[ResourceConflict]) -> Response {
    let payload = json!({
        "error": "requested window conflicts with existing reservations",
        "conflicts": conflicts
            .iter()
            .map(ResourceConflictView::from_conflict)
            .collect::<Vec<_>>(),
    });
    (StatusCode::CONFLICT, axum::Json(payload)).into_response()
}

fn error_response(error: AdmissionError) -> Response {
    let status = match &error {
        AdmissionError::Window(_) | AdmissionError::Lifecycle(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AdmissionError::Availability(AvailabilityError::UnknownResource(_))
        | AdmissionError::UnknownReservation(_) => StatusCode::NOT_FOUND,
        AdmissionError::Busy => StatusCode::SERVICE_UNAVAILABLE,
        AdmissionError::Availability(AvailabilityError::Repository(_))
        | AdmissionError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
