use fleet_ops::workflows::reservations::TenantId;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Tenant used by the CLI walkthrough and `--fleet` seeding. Real
/// deployments resolve tenants upstream and pass them per request.
pub(crate) fn demo_tenant() -> TenantId {
    TenantId("acme-rentals".to_string())
}
