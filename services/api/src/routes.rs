use crate::infra::AppState;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use fleet_ops::workflows::reservations::{
    reservation_router, tenant_from_headers, AdmissionService, InMemoryEventPublisher,
    InMemoryReservationRepository, ResourceId,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_reservation_routes(
    service: Arc<AdmissionService<InMemoryReservationRepository, InMemoryEventPublisher>>,
) -> axum::Router {
    reservation_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/resources",
            axum::routing::post(register_resource_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Vehicles normally arrive from the fleet inventory sync; this endpoint
/// stands in for it so the in-memory deployment can be exercised.
#[derive(Debug, Deserialize)]
pub(crate) struct RegisterResourceRequest {
    pub(crate) resource_id: String,
}

pub(crate) async fn register_resource_endpoint(
    Extension(repository): Extension<Arc<InMemoryReservationRepository>>,
    headers: HeaderMap,
    Json(request): Json<RegisterResourceRequest>,
) -> Response {
    let tenant = match tenant_from_headers(&headers) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };

    repository.register_resource(tenant, ResourceId(request.resource_id.clone()));
    (
        StatusCode::CREATED,
        Json(json!({ "resource_id": request.resource_id })),
    )
        .into_response()
}
