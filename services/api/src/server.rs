use crate::cli::ServeArgs;
use crate::infra::{demo_tenant, AppState};
use crate::routes::with_reservation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use fleet_ops::config::AppConfig;
use fleet_ops::error::AppError;
use fleet_ops::telemetry;
use fleet_ops::workflows::reservations::{
    AdmissionConfig, AdmissionService, InMemoryEventPublisher, InMemoryReservationRepository,
    ResourceId,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryReservationRepository::default());
    for vehicle in &args.fleet {
        repository.register_resource(demo_tenant(), ResourceId(vehicle.clone()));
    }
    let events = Arc::new(InMemoryEventPublisher::default());
    let service = Arc::new(AdmissionService::new(
        repository.clone(),
        events,
        AdmissionConfig {
            lock_wait: config.admission.lock_wait,
            lock_retries: config.admission.lock_retries,
        },
    ));

    let app = with_reservation_routes(service)
        .layer(Extension(app_state))
        .layer(Extension(repository))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "reservation admission service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
