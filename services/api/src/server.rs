use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryActivityLog, SimulatedLedger};
use crate::routes::with_donation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use pulse_connect::config::AppConfig;
use pulse_connect::error::AppError;
use pulse_connect::telemetry;
use pulse_connect::workflows::donation::{AppointmentService, InMemoryDonationStore};
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

    let store = Arc::new(InMemoryDonationStore::default());
    let activity = Arc::new(InMemoryActivityLog::default());
    let ledger = Arc::new(SimulatedLedger::default());
    let service = Arc::new(AppointmentService::new(
        store,
        activity,
        ledger,
        config.eligibility.clone(),
    )?);

    let app = with_donation_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        blood_cooldown_days = config.eligibility.blood_cooldown_days,
        plasma_cooldown_days = config.eligibility.plasma_cooldown_days,
        "donation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
