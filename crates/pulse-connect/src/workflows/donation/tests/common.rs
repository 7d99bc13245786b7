use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::donation::appointments::repository::{
    AcceptanceCommit, ActivityError, ActivityPublisher, AppointmentRecord, BloodRequestClosure,
    DonationRepository, HospitalActivity, RepositoryError, StatusTransition,
};
use crate::workflows::donation::appointments::{
    donation_router_with_clock, AppointmentService, FixedClock, InMemoryDonationStore,
};
use crate::workflows::donation::domain::{
    AppointmentId, AppointmentRequest, BloodRequest, BloodRequestId, BloodType, DonationRecord,
    DonationType, DonorHealthProfile, DonorId, HealthIntake, HospitalId, MedicalFlags,
    NewBloodRequest, RequestUrgency,
};
use crate::workflows::donation::eligibility::CooldownPolicy;
use crate::workflows::donation::ledger::{
    DonationLedger, LedgerError, LedgerReceipt, LedgerSubmission,
};

pub(super) type TestService = AppointmentService<InMemoryDonationStore, MemoryActivity, MemoryLedger>;

pub(super) fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn today() -> NaiveDate {
    day(2026, 6, 1)
}

pub(super) fn days_after(date: NaiveDate, days: i64) -> NaiveDate {
    date + chrono::Duration::days(days)
}

pub(super) fn healthy_profile(donor: &str) -> DonorHealthProfile {
    DonorHealthProfile {
        donor_id: DonorId(donor.to_string()),
        age_years: 30,
        weight_kg: 70.0,
        blood_type: BloodType::OPositive,
        medical_flags: MedicalFlags::default(),
        last_donation: None,
    }
}

pub(super) fn donated(
    donor: &str,
    donation_type: DonationType,
    date: NaiveDate,
) -> DonorHealthProfile {
    let mut profile = healthy_profile(donor);
    profile.last_donation = Some(DonationRecord {
        date,
        donation_type,
    });
    profile
}

pub(super) fn intake(weight_kg: f64, medical_flags: MedicalFlags) -> HealthIntake {
    HealthIntake {
        age_years: 30,
        weight_kg,
        blood_type: BloodType::OPositive,
        medical_flags,
    }
}

pub(super) fn appointment_request(
    donor: &str,
    donation_type: DonationType,
    requested_date: NaiveDate,
) -> AppointmentRequest {
    AppointmentRequest {
        donor_id: DonorId(donor.to_string()),
        hospital_id: HospitalId("hosp-city".to_string()),
        donation_type,
        requested_date,
        request_id: None,
    }
}

pub(super) fn blood_request_submission(
    blood_type: BloodType,
    urgency: RequestUrgency,
) -> NewBloodRequest {
    NewBloodRequest {
        patient_name: "Patient Rahman".to_string(),
        blood_type,
        donation_type: DonationType::Blood,
        quantity_ml: 450,
        urgency,
        location: Some("Ward 4".to_string()),
        description: None,
    }
}

pub(super) fn build_service() -> (
    TestService,
    Arc<InMemoryDonationStore>,
    Arc<MemoryActivity>,
    Arc<MemoryLedger>,
) {
    let store = Arc::new(InMemoryDonationStore::default());
    let activity = Arc::new(MemoryActivity::default());
    let ledger = Arc::new(MemoryLedger::default());
    let service = AppointmentService::new(
        store.clone(),
        activity.clone(),
        ledger.clone(),
        CooldownPolicy::default(),
    )
    .expect("default policy is valid");
    (service, store, activity, ledger)
}

#[derive(Default, Clone)]
pub(super) struct MemoryActivity {
    events: Arc<Mutex<Vec<HospitalActivity>>>,
}

impl MemoryActivity {
    pub(super) fn events(&self) -> Vec<HospitalActivity> {
        self.events.lock().expect("activity mutex poisoned").clone()
    }

    pub(super) fn activity_types(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|event| event.activity_type)
            .collect()
    }
}

impl ActivityPublisher for MemoryActivity {
    fn publish(&self, activity: HospitalActivity) -> Result<(), ActivityError> {
        self.events
            .lock()
            .expect("activity mutex poisoned")
            .push(activity);
        Ok(())
    }
}

pub(super) struct OfflineActivity;

impl ActivityPublisher for OfflineActivity {
    fn publish(&self, _activity: HospitalActivity) -> Result<(), ActivityError> {
        Err(ActivityError::Transport("audit log offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryLedger {
    sequence: AtomicU64,
    payloads: Mutex<Vec<Vec<u8>>>,
}

impl MemoryLedger {
    pub(super) fn payloads(&self) -> Vec<Vec<u8>> {
        self.payloads.lock().expect("ledger mutex poisoned").clone()
    }
}

impl DonationLedger for MemoryLedger {
    fn record(
        &self,
        submission: &LedgerSubmission,
        recorded_on: NaiveDate,
    ) -> Result<LedgerReceipt, LedgerError> {
        let payload = submission.payload()?;
        self.payloads
            .lock()
            .expect("ledger mutex poisoned")
            .push(payload);
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(LedgerReceipt {
            tx_hash: format!("0x{id:064x}"),
            network: "test".to_string(),
            recorded_on,
        })
    }
}

pub(super) struct OfflineLedger;

impl DonationLedger for OfflineLedger {
    fn record(
        &self,
        _submission: &LedgerSubmission,
        _recorded_on: NaiveDate,
    ) -> Result<LedgerReceipt, LedgerError> {
        Err(LedgerError::Transport("rpc endpoint unreachable".to_string()))
    }
}

/// Store whose every call fails, for 500 mapping checks.
pub(super) struct UnavailableRepository;

impl DonationRepository for UnavailableRepository {
    fn insert_donor(
        &self,
        _profile: DonorHealthProfile,
    ) -> Result<DonorHealthProfile, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_health(
        &self,
        _donor_id: &DonorId,
        _intake: HealthIntake,
    ) -> Result<DonorHealthProfile, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_donor(&self, _id: &DonorId) -> Result<Option<DonorHealthProfile>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_appointment(
        &self,
        _record: AppointmentRecord,
    ) -> Result<AppointmentRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_appointment(
        &self,
        _id: &AppointmentId,
    ) -> Result<Option<AppointmentRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn transition(
        &self,
        _transition: StatusTransition,
    ) -> Result<AppointmentRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn commit_acceptance(
        &self,
        _commit: AcceptanceCommit,
    ) -> Result<(AppointmentRecord, DonorHealthProfile), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn attach_ledger_receipt(
        &self,
        _id: &AppointmentId,
        _receipt: LedgerReceipt,
    ) -> Result<AppointmentRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn hospital_appointments(
        &self,
        _hospital_id: &HospitalId,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn pending(&self, _limit: usize) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_blood_request(
        &self,
        _request: BloodRequest,
    ) -> Result<BloodRequest, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_blood_request(
        &self,
        _id: &BloodRequestId,
    ) -> Result<Option<BloodRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn close_blood_request(
        &self,
        _closure: BloodRequestClosure,
    ) -> Result<BloodRequest, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn hospital_blood_requests(
        &self,
        _hospital_id: &HospitalId,
    ) -> Result<Vec<BloodRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn open_blood_requests(&self) -> Result<Vec<BloodRequest>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Router whose clock reads `today()`.
pub(super) fn router_with_service(service: TestService) -> axum::Router {
    donation_router_with_clock(Arc::new(service), Arc::new(FixedClock(today())))
}
