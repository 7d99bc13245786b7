use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::super::domain::{
    AppointmentId, AppointmentRequest, BloodRequestId, BloodRequestResolution, DonationType,
    DonorHealthProfile, DonorId, HealthIntake, HospitalId, NewBloodRequest,
};
use super::super::eligibility::{EligibilityError, RejectionReason};
use super::super::ledger::DonationLedger;
use super::clock::{Clock, SystemClock};
use super::repository::{ActivityPublisher, DonationRepository, RepositoryError};
use super::service::{AppointmentService, AppointmentServiceError};

type SharedService<R, A, L> = Arc<AppointmentService<R, A, L>>;
type SharedClock = Arc<dyn Clock>;

/// Router builder exposing donor, eligibility, appointment, and blood request endpoints.
/// Writes are dated by the host clock.
pub fn donation_router<R, A, L>(service: SharedService<R, A, L>) -> Router
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    donation_router_with_clock(service, Arc::new(SystemClock))
}

pub fn donation_router_with_clock<R, A, L>(
    service: SharedService<R, A, L>,
    clock: SharedClock,
) -> Router
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    Router::new()
        .route("/api/v1/donors", post(register_donor_handler::<R, A, L>))
        .route(
            "/api/v1/donors/:donor_id",
            get(donor_handler::<R, A, L>),
        )
        .route(
            "/api/v1/donors/:donor_id/health",
            put(health_intake_handler::<R, A, L>),
        )
        .route(
            "/api/v1/donors/:donor_id/eligibility",
            post(eligibility_handler::<R, A, L>),
        )
        .route(
            "/api/v1/appointments",
            post(request_appointment_handler::<R, A, L>),
        )
        .route(
            "/api/v1/appointments/:appointment_id",
            get(appointment_handler::<R, A, L>),
        )
        .route(
            "/api/v1/appointments/:appointment_id/accept",
            post(accept_handler::<R, A, L>),
        )
        .route(
            "/api/v1/appointments/:appointment_id/reject",
            post(reject_handler::<R, A, L>),
        )
        .route(
            "/api/v1/appointments/:appointment_id/discard",
            post(discard_handler::<R, A, L>),
        )
        .route(
            "/api/v1/appointments/:appointment_id/verify",
            post(verify_handler::<R, A, L>),
        )
        .route(
            "/api/v1/hospitals/:hospital_id/appointments",
            get(hospital_appointments_handler::<R, A, L>),
        )
        .route(
            "/api/v1/hospitals/:hospital_id/requests",
            get(hospital_blood_requests_handler::<R, A, L>)
                .post(create_blood_request_handler::<R, A, L>),
        )
        .route(
            "/api/v1/requests",
            get(open_blood_requests_handler::<R, A, L>),
        )
        .route(
            "/api/v1/requests/:request_id",
            get(blood_request_handler::<R, A, L>),
        )
        .route(
            "/api/v1/requests/:request_id/close",
            post(close_blood_request_handler::<R, A, L>),
        )
        .layer(Extension(clock))
        .with_state(service)
}

/// What-if evaluations may pick their own date; nothing is written.
#[derive(Debug, Deserialize)]
pub(crate) struct EligibilityPayload {
    donation_type: DonationType,
    #[serde(default)]
    today: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DecisionPayload {
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ClosePayload {
    #[serde(default)]
    resolution: BloodRequestResolution,
}

pub(crate) async fn register_donor_handler<R, A, L>(
    State(service): State<SharedService<R, A, L>>,
    Extension(clock): Extension<SharedClock>,
    axum::Json(profile): axum::Json<DonorHealthProfile>,
) -> Response
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    match service.register_donor(profile, clock.today()) {
        Ok(profile) => (StatusCode::CREATED, axum::Json(profile)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn donor_handler<R, A, L>(
    State(service): State<SharedService<R, A, L>>,
    Path(donor_id): Path<String>,
) -> Response
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    match service.donor(&DonorId(donor_id)) {
        Ok(profile) => (StatusCode::OK, axum::Json(profile)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn health_intake_handler<R, A, L>(
    State(service): State<SharedService<R, A, L>>,
    Extension(clock): Extension<SharedClock>,
    Path(donor_id): Path<String>,
    axum::Json(intake): axum::Json<HealthIntake>,
) -> Response
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    match service.update_health_intake(&DonorId(donor_id), intake, clock.today()) {
        Ok(profile) => (StatusCode::OK, axum::Json(profile)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn eligibility_handler<R, A, L>(
    State(service): State<SharedService<R, A, L>>,
    Extension(clock): Extension<SharedClock>,
    Path(donor_id): Path<String>,
    axum::Json(payload): axum::Json<EligibilityPayload>,
) -> Response
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    let today = payload.today.unwrap_or_else(|| clock.today());
    match service.eligibility(&DonorId(donor_id), payload.donation_type, today) {
        Ok(verdict) => (StatusCode::OK, axum::Json(verdict)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn request_appointment_handler<R, A, L>(
    State(service): State<SharedService<R, A, L>>,
    Extension(clock): Extension<SharedClock>,
    axum::Json(request): axum::Json<AppointmentRequest>,
) -> Response
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    match service.request_appointment(request, clock.today()) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn appointment_handler<R, A, L>(
    State(service): State<SharedService<R, A, L>>,
    Path(appointment_id): Path<String>,
) -> Response
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    match service.get(&AppointmentId(appointment_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn accept_handler<R, A, L>(
    State(service): State<SharedService<R, A, L>>,
    Extension(clock): Extension<SharedClock>,
    Path(appointment_id): Path<String>,
) -> Response
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    let today = clock.today();
    match service.accept(&AppointmentId(appointment_id), today) {
        Ok(outcome) => {
            let payload = json!({
                "appointment": outcome.appointment.status_view(),
                "donor_id": outcome.donor.donor_id,
                "next_eligible_date": outcome.next_eligible_date,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reject_handler<R, A, L>(
    State(service): State<SharedService<R, A, L>>,
    Extension(clock): Extension<SharedClock>,
    Path(appointment_id): Path<String>,
    payload: Option<axum::Json<DecisionPayload>>,
) -> Response
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    let note = decision(payload).note;
    match service.reject(&AppointmentId(appointment_id), note, clock.today()) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn discard_handler<R, A, L>(
    State(service): State<SharedService<R, A, L>>,
    Extension(clock): Extension<SharedClock>,
    Path(appointment_id): Path<String>,
) -> Response
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    let today = clock.today();
    match service.discard(&AppointmentId(appointment_id), today) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn verify_handler<R, A, L>(
    State(service): State<SharedService<R, A, L>>,
    Extension(clock): Extension<SharedClock>,
    Path(appointment_id): Path<String>,
) -> Response
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    let today = clock.today();
    match service.verify_donation(&AppointmentId(appointment_id), today) {
        Ok(record) => (StatusCode::OK, axum::Json(record.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn hospital_appointments_handler<R, A, L>(
    State(service): State<SharedService<R, A, L>>,
    Path(hospital_id): Path<String>,
) -> Response
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    match service.hospital_appointments(&HospitalId(hospital_id)) {
        Ok(records) => {
            let views: Vec<_> = records
                .iter()
                .map(|record| record.status_view())
                .collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_blood_request_handler<R, A, L>(
    State(service): State<SharedService<R, A, L>>,
    Extension(clock): Extension<SharedClock>,
    Path(hospital_id): Path<String>,
    axum::Json(submission): axum::Json<NewBloodRequest>,
) -> Response
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    match service.create_blood_request(HospitalId(hospital_id), submission, clock.today()) {
        Ok(request) => (StatusCode::CREATED, axum::Json(request)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn hospital_blood_requests_handler<R, A, L>(
    State(service): State<SharedService<R, A, L>>,
    Path(hospital_id): Path<String>,
) -> Response
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    match service.hospital_blood_requests(&HospitalId(hospital_id)) {
        Ok(requests) => (StatusCode::OK, axum::Json(requests)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn open_blood_requests_handler<R, A, L>(
    State(service): State<SharedService<R, A, L>>,
) -> Response
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    match service.open_blood_requests() {
        Ok(requests) => (StatusCode::OK, axum::Json(requests)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn blood_request_handler<R, A, L>(
    State(service): State<SharedService<R, A, L>>,
    Path(request_id): Path<String>,
) -> Response
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    match service.blood_request(&BloodRequestId(request_id)) {
        Ok(request) => (StatusCode::OK, axum::Json(request)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn close_blood_request_handler<R, A, L>(
    State(service): State<SharedService<R, A, L>>,
    Extension(clock): Extension<SharedClock>,
    Path(request_id): Path<String>,
    payload: Option<axum::Json<ClosePayload>>,
) -> Response
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    let resolution = payload
        .map(|axum::Json(payload)| payload)
        .unwrap_or_default()
        .resolution;
    match service.close_blood_request(&BloodRequestId(request_id), resolution, clock.today()) {
        Ok(request) => (StatusCode::OK, axum::Json(request)).into_response(),
        Err(error) => error_response(error),
    }
}

// Hospital actions are usually bodyless POSTs.
fn decision(payload: Option<axum::Json<DecisionPayload>>) -> DecisionPayload {
    payload
        .map(|axum::Json(payload)| payload)
        .unwrap_or_default()
}

pub(crate) fn status_for(error: &AppointmentServiceError) -> StatusCode {
    match error {
        AppointmentServiceError::Eligibility(_)
        | AppointmentServiceError::Rejected(_)
        | AppointmentServiceError::RequestedDateInPast { .. }
        | AppointmentServiceError::DecisionBeforeRequest { .. }
        | AppointmentServiceError::InvalidBloodRequest(_)
        | AppointmentServiceError::BloodRequestMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AppointmentServiceError::InvalidTransition { .. }
        | AppointmentServiceError::NotAccepted { .. } => StatusCode::CONFLICT,
        AppointmentServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AppointmentServiceError::Repository(
            RepositoryError::Conflict
            | RepositoryError::StaleState { .. }
            | RepositoryError::StaleSnapshot
            | RepositoryError::RequestNotOpen(_),
        ) => StatusCode::CONFLICT,
        AppointmentServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        AppointmentServiceError::Ledger(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(error: AppointmentServiceError) -> Response {
    let status = status_for(&error);
    let payload = match &error {
        AppointmentServiceError::Rejected(RejectionReason::Disqualified {
            reason,
            next_eligible_date,
        }) => json!({
            "error": error.to_string(),
            "reason": reason.code(),
            "next_eligible_date": next_eligible_date,
        }),
        AppointmentServiceError::Eligibility(EligibilityError::InvalidProfile {
            donor_id, ..
        }) => json!({
            "error": error.to_string(),
            "donor_id": donor_id,
        }),
        _ => json!({ "error": error.to_string() }),
    };
    (status, axum::Json(payload)).into_response()
}
