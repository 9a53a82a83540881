use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_program_routes;
use academy::clock::SystemClock;
use academy::config::AppConfig;
use academy::error::AppError;
use academy::notify::LogNotifier;
use academy::store::InMemoryStore;
use academy::{telemetry, ProgramServices};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let services = Arc::new(ProgramServices::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(LogNotifier),
        Arc::new(SystemClock),
        config.admission,
    ));

    let app = with_program_routes(services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        capacity_policy = ?config.admission.capacity,
        enforce_deadline = config.admission.enforce_deadline,
        "academy program service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
