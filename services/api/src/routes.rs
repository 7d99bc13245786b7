use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use pulse_connect::workflows::donation::appointments::{ActivityPublisher, DonationRepository};
use pulse_connect::workflows::donation::ledger::DonationLedger;
use pulse_connect::workflows::donation::{donation_router, AppointmentService, CooldownPolicy};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_donation_routes<R, A, L>(
    service: Arc<AppointmentService<R, A, L>>,
) -> axum::Router
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    let policy = service.policy().clone();

    donation_router(service)
        .route("/api/v1/policy", axum::routing::get(policy_endpoint))
        .layer(Extension(policy))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
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

/// Thresholds the running service applies, for hospital staff and donor tooling.
pub(crate) async fn policy_endpoint(
    Extension(policy): Extension<CooldownPolicy>,
) -> Json<CooldownPolicy> {
    Json(policy)
}
