use crate::cli::ServeArgs;
use crate::infra::{AppState, IntakeState};
use crate::routes::with_intake_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use facility_intake::config::AppConfig;
use facility_intake::error::AppError;
use facility_intake::telemetry;
use facility_intake::workflows::intake::{CoherencePolicy, HttpAnalysisDispatcher};
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

    let dispatcher = Arc::new(HttpAnalysisDispatcher::new(&config.analysis)?);
    info!(endpoint = dispatcher.endpoint(), "analysis dispatcher configured");
    let intake_state = IntakeState::new(CoherencePolicy::default(), dispatcher);

    let app = with_intake_routes(intake_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "facility intake service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
