use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::super::domain::{
    AppointmentId, AppointmentRequest, AppointmentStatus, BloodRequest, BloodRequestId,
    BloodRequestStatus, DonationRecord, DonorHealthProfile, DonorId, HealthIntake, HospitalId,
};
use super::super::ledger::LedgerReceipt;

/// Stored appointment along with its decision trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub appointment_id: AppointmentId,
    pub request: AppointmentRequest,
    pub status: AppointmentStatus,
    pub created_on: NaiveDate,
    pub decided_on: Option<NaiveDate>,
    pub note: Option<String>,
    pub ledger_receipt: Option<LedgerReceipt>,
}

impl AppointmentRecord {
    pub fn pending(
        appointment_id: AppointmentId,
        request: AppointmentRequest,
        created_on: NaiveDate,
    ) -> Self {
        Self {
            appointment_id,
            request,
            status: AppointmentStatus::Pending,
            created_on,
            decided_on: None,
            note: None,
            ledger_receipt: None,
        }
    }

    pub fn status_view(&self) -> AppointmentStatusView {
        AppointmentStatusView {
            appointment_id: self.appointment_id.clone(),
            donor_id: self.request.donor_id.clone(),
            hospital_id: self.request.hospital_id.clone(),
            donation_type: self.request.donation_type.label(),
            requested_date: self.request.requested_date,
            request_id: self.request.request_id.clone(),
            status: self.status.label(),
            decided_on: self.decided_on,
            note: self.note.clone(),
            ledger_tx_hash: self
                .ledger_receipt
                .as_ref()
                .map(|receipt| receipt.tx_hash.clone()),
        }
    }
}

/// Compare-and-set request for a Pending → terminal transition other than acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub appointment_id: AppointmentId,
    pub expected: AppointmentStatus,
    pub next: AppointmentStatus,
    pub decided_on: NaiveDate,
    pub note: Option<String>,
}

/// Everything the store needs to apply an acceptance atomically.
///
/// `expected_last_donation` is the donor history the eligibility check ran against; the
/// store refuses the commit when the donor's history moved in the meantime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptanceCommit {
    pub appointment_id: AppointmentId,
    pub donor_id: DonorId,
    pub accepted_on: NaiveDate,
    pub expected_last_donation: Option<DonationRecord>,
    pub donation: DonationRecord,
}

/// Compare-and-set request closing an open blood request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloodRequestClosure {
    pub request_id: BloodRequestId,
    pub status: BloodRequestStatus,
    pub closed_on: NaiveDate,
}

/// Storage abstraction for donor profiles, appointments, and hospital blood requests.
///
/// Implementations must apply `commit_acceptance` and `transition` as single atomic
/// compare-and-set operations keyed on the appointment's current status. An appointment
/// linked to a blood request is only stored while that request is open, and
/// `close_blood_request` only closes an open request.
pub trait DonationRepository: Send + Sync {
    fn insert_donor(
        &self,
        profile: DonorHealthProfile,
    ) -> Result<DonorHealthProfile, RepositoryError>;
    fn update_health(
        &self,
        donor_id: &DonorId,
        intake: HealthIntake,
    ) -> Result<DonorHealthProfile, RepositoryError>;
    fn fetch_donor(&self, id: &DonorId) -> Result<Option<DonorHealthProfile>, RepositoryError>;

    fn insert_appointment(
        &self,
        record: AppointmentRecord,
    ) -> Result<AppointmentRecord, RepositoryError>;
    fn fetch_appointment(
        &self,
        id: &AppointmentId,
    ) -> Result<Option<AppointmentRecord>, RepositoryError>;
    fn transition(&self, transition: StatusTransition)
        -> Result<AppointmentRecord, RepositoryError>;
    fn commit_acceptance(
        &self,
        commit: AcceptanceCommit,
    ) -> Result<(AppointmentRecord, DonorHealthProfile), RepositoryError>;
    fn attach_ledger_receipt(
        &self,
        id: &AppointmentId,
        receipt: LedgerReceipt,
    ) -> Result<AppointmentRecord, RepositoryError>;
    fn hospital_appointments(
        &self,
        hospital_id: &HospitalId,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError>;
    fn pending(&self, limit: usize) -> Result<Vec<AppointmentRecord>, RepositoryError>;

    fn insert_blood_request(&self, request: BloodRequest) -> Result<BloodRequest, RepositoryError>;
    fn fetch_blood_request(
        &self,
        id: &BloodRequestId,
    ) -> Result<Option<BloodRequest>, RepositoryError>;
    fn close_blood_request(
        &self,
        closure: BloodRequestClosure,
    ) -> Result<BloodRequest, RepositoryError>;
    /// Newest first.
    fn hospital_blood_requests(
        &self,
        hospital_id: &HospitalId,
    ) -> Result<Vec<BloodRequest>, RepositoryError>;
    /// Newest first.
    fn open_blood_requests(&self) -> Result<Vec<BloodRequest>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("appointment is {found}, expected {expected}")]
    StaleState {
        expected: AppointmentStatus,
        found: AppointmentStatus,
    },
    #[error("donor history changed since eligibility was checked")]
    StaleSnapshot,
    #[error("blood request is {0}")]
    RequestNotOpen(BloodRequestStatus),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound audit hook for hospital-side activity.
pub trait ActivityPublisher: Send + Sync {
    fn publish(&self, activity: HospitalActivity) -> Result<(), ActivityError>;
}

/// Audit entry describing a workflow event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalActivity {
    pub activity_type: String,
    pub hospital_id: HospitalId,
    pub appointment_id: AppointmentId,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ActivityError {
    #[error("activity log unavailable: {0}")]
    Transport(String),
}

/// Sanitized appointment representation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentStatusView {
    pub appointment_id: AppointmentId,
    pub donor_id: DonorId,
    pub hospital_id: HospitalId,
    pub donation_type: &'static str,
    pub requested_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<BloodRequestId>,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_tx_hash: Option<String>,
}
