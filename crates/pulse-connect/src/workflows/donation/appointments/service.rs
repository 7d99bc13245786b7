use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::super::domain::{
    AppointmentId, AppointmentRequest, AppointmentStatus, BloodRequest, BloodRequestId,
    BloodRequestResolution, DonationType, DonorHealthProfile, DonorId, HealthIntake, HospitalId,
    NewBloodRequest,
};
use super::super::eligibility::{
    recorded_donation, validate_profile, CooldownPolicy, EligibilityError, EligibilityTracker,
    EligibilityVerdict, RejectionReason,
};
use super::super::ledger::{DonationLedger, LedgerError, LedgerSubmission};
use super::repository::{
    AcceptanceCommit, ActivityPublisher, AppointmentRecord, BloodRequestClosure,
    DonationRepository, HospitalActivity, RepositoryError, StatusTransition,
};

/// Service composing the eligibility tracker, store, audit log, and ledger.
pub struct AppointmentService<R, A, L> {
    tracker: Arc<EligibilityTracker>,
    repository: Arc<R>,
    activity: Arc<A>,
    ledger: Arc<L>,
}

static APPOINTMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static BLOOD_REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_appointment_id() -> AppointmentId {
    let id = APPOINTMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AppointmentId(format!("apt-{id:06}"))
}

fn next_blood_request_id() -> BloodRequestId {
    let id = BLOOD_REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BloodRequestId(format!("req-{id:06}"))
}

/// Result of a hospital accepting an appointment.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptanceOutcome {
    pub appointment: AppointmentRecord,
    pub donor: DonorHealthProfile,
    /// When the donor may give the same donation type again.
    pub next_eligible_date: NaiveDate,
}

impl<R, A, L> AppointmentService<R, A, L>
where
    R: DonationRepository + 'static,
    A: ActivityPublisher + 'static,
    L: DonationLedger + 'static,
{
    pub fn new(
        repository: Arc<R>,
        activity: Arc<A>,
        ledger: Arc<L>,
        policy: CooldownPolicy,
    ) -> Result<Self, EligibilityError> {
        let tracker = EligibilityTracker::new(policy)?;
        Ok(Self::with_tracker(tracker, repository, activity, ledger))
    }

    pub fn with_tracker(
        tracker: EligibilityTracker,
        repository: Arc<R>,
        activity: Arc<A>,
        ledger: Arc<L>,
    ) -> Self {
        Self {
            tracker: Arc::new(tracker),
            repository,
            activity,
            ledger,
        }
    }

    pub fn policy(&self) -> &CooldownPolicy {
        self.tracker.policy()
    }

    pub fn register_donor(
        &self,
        profile: DonorHealthProfile,
        today: NaiveDate,
    ) -> Result<DonorHealthProfile, AppointmentServiceError> {
        validate_profile(&profile, today)?;
        let stored = self.repository.insert_donor(profile)?;
        info!(donor_id = %stored.donor_id.0, "donor registered");
        Ok(stored)
    }

    /// Refresh the questionnaire answers. Donation history is left untouched.
    pub fn update_health_intake(
        &self,
        donor_id: &DonorId,
        intake: HealthIntake,
        today: NaiveDate,
    ) -> Result<DonorHealthProfile, AppointmentServiceError> {
        let mut candidate = self.donor(donor_id)?;
        candidate.apply_intake(intake.clone());
        validate_profile(&candidate, today)?;

        let updated = self.repository.update_health(donor_id, intake)?;
        Ok(updated)
    }

    pub fn donor(&self, donor_id: &DonorId) -> Result<DonorHealthProfile, AppointmentServiceError> {
        let profile = self
            .repository
            .fetch_donor(donor_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(profile)
    }

    pub fn eligibility(
        &self,
        donor_id: &DonorId,
        donation_type: DonationType,
        today: NaiveDate,
    ) -> Result<EligibilityVerdict, AppointmentServiceError> {
        let profile = self.donor(donor_id)?;
        let verdict = self.tracker.evaluate(&profile, donation_type, today)?;
        Ok(verdict)
    }

    /// Donor-facing intake. Eligibility is judged for the requested date.
    pub fn request_appointment(
        &self,
        request: AppointmentRequest,
        today: NaiveDate,
    ) -> Result<AppointmentRecord, AppointmentServiceError> {
        if request.requested_date < today {
            return Err(AppointmentServiceError::RequestedDateInPast {
                requested: request.requested_date,
                today,
            });
        }

        if let Some(request_id) = &request.request_id {
            self.ensure_request_matches(request_id, &request)?;
        }

        let profile = self.donor(&request.donor_id)?;
        if let Err(reason) = self
            .tracker
            .can_accept(&profile, &request, request.requested_date)
        {
            warn!(donor_id = %request.donor_id.0, %reason, "appointment request refused");
            return Err(reason.into());
        }

        let record = AppointmentRecord::pending(next_appointment_id(), request, today);
        let stored = self.repository.insert_appointment(record)?;
        info!(
            appointment_id = %stored.appointment_id.0,
            hospital_id = %stored.request.hospital_id.0,
            donation_type = %stored.request.donation_type,
            "appointment requested"
        );

        self.publish(&stored, "appointment_requested", BTreeMap::new());
        Ok(stored)
    }

    /// Hospital-facing acceptance. Eligibility is re-checked against a fresh donor snapshot
    /// and the store commits only if neither the appointment nor the donor history moved.
    pub fn accept(
        &self,
        appointment_id: &AppointmentId,
        today: NaiveDate,
    ) -> Result<AcceptanceOutcome, AppointmentServiceError> {
        let record = self.get(appointment_id)?;
        ensure_pending(&record, AppointmentStatus::Accepted)?;
        ensure_not_before_request(&record, today)?;

        let profile = self.donor(&record.request.donor_id)?;
        if let Err(reason) = self.tracker.can_accept(&profile, &record.request, today) {
            warn!(
                appointment_id = %appointment_id.0,
                %reason,
                "acceptance refused"
            );
            return Err(reason.into());
        }

        let commit = AcceptanceCommit {
            appointment_id: appointment_id.clone(),
            donor_id: profile.donor_id.clone(),
            accepted_on: today,
            expected_last_donation: profile.last_donation,
            donation: recorded_donation(&record.request, today),
        };
        let (appointment, donor) = self.repository.commit_acceptance(commit)?;

        let next_eligible_date = self
            .tracker
            .evaluate(&donor, appointment.request.donation_type, today)?
            .next_eligible_date;

        info!(
            appointment_id = %appointment_id.0,
            donor_id = %donor.donor_id.0,
            %next_eligible_date,
            "appointment accepted"
        );

        let mut details = BTreeMap::new();
        details.insert("donor_id".to_string(), donor.donor_id.0.clone());
        details.insert(
            "donation_type".to_string(),
            appointment.request.donation_type.label().to_string(),
        );
        details.insert(
            "next_eligible_date".to_string(),
            next_eligible_date.to_string(),
        );
        self.publish(&appointment, "donation_received", details);

        Ok(AcceptanceOutcome {
            appointment,
            donor,
            next_eligible_date,
        })
    }

    pub fn reject(
        &self,
        appointment_id: &AppointmentId,
        note: Option<String>,
        today: NaiveDate,
    ) -> Result<AppointmentRecord, AppointmentServiceError> {
        self.close(appointment_id, AppointmentStatus::Rejected, note, today)
    }

    pub fn discard(
        &self,
        appointment_id: &AppointmentId,
        today: NaiveDate,
    ) -> Result<AppointmentRecord, AppointmentServiceError> {
        self.close(appointment_id, AppointmentStatus::Discarded, None, today)
    }

    /// Anchor an accepted donation on the ledger. Each appointment is verified once.
    pub fn verify_donation(
        &self,
        appointment_id: &AppointmentId,
        today: NaiveDate,
    ) -> Result<AppointmentRecord, AppointmentServiceError> {
        let record = self.get(appointment_id)?;
        if record.status != AppointmentStatus::Accepted {
            return Err(AppointmentServiceError::NotAccepted {
                appointment_id: appointment_id.clone(),
                status: record.status,
            });
        }
        if record.ledger_receipt.is_some() {
            return Err(RepositoryError::Conflict.into());
        }

        let submission = LedgerSubmission::for_accepted(&record, today);
        let receipt = self.ledger.record(&submission, today)?;
        let updated = self
            .repository
            .attach_ledger_receipt(appointment_id, receipt)?;

        let mut details = BTreeMap::new();
        if let Some(receipt) = &updated.ledger_receipt {
            details.insert("tx_hash".to_string(), receipt.tx_hash.clone());
            details.insert("network".to_string(), receipt.network.clone());
        }
        info!(appointment_id = %appointment_id.0, "donation verified on ledger");
        self.publish(&updated, "donation_verified", details);

        Ok(updated)
    }

    pub fn get(
        &self,
        appointment_id: &AppointmentId,
    ) -> Result<AppointmentRecord, AppointmentServiceError> {
        let record = self
            .repository
            .fetch_appointment(appointment_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    /// Appointments for one hospital, newest first.
    pub fn hospital_appointments(
        &self,
        hospital_id: &HospitalId,
    ) -> Result<Vec<AppointmentRecord>, AppointmentServiceError> {
        Ok(self.repository.hospital_appointments(hospital_id)?)
    }

    pub fn pending(&self, limit: usize) -> Result<Vec<AppointmentRecord>, AppointmentServiceError> {
        Ok(self.repository.pending(limit)?)
    }

    /// Post a hospital's need for blood or plasma. Emergencies are requests with
    /// `RequestUrgency::Emergency`.
    pub fn create_blood_request(
        &self,
        hospital_id: HospitalId,
        submission: NewBloodRequest,
        today: NaiveDate,
    ) -> Result<BloodRequest, AppointmentServiceError> {
        if submission.patient_name.trim().is_empty() {
            return Err(AppointmentServiceError::InvalidBloodRequest(
                "patient name is required",
            ));
        }
        if submission.quantity_ml == 0 {
            return Err(AppointmentServiceError::InvalidBloodRequest(
                "quantity must be greater than zero",
            ));
        }

        let request = BloodRequest::open(next_blood_request_id(), hospital_id, submission, today);
        let stored = self.repository.insert_blood_request(request)?;
        info!(
            request_id = %stored.request_id.0,
            hospital_id = %stored.hospital_id.0,
            blood_type = %stored.blood_type,
            urgency = %stored.urgency,
            "blood request opened"
        );
        Ok(stored)
    }

    pub fn blood_request(
        &self,
        request_id: &BloodRequestId,
    ) -> Result<BloodRequest, AppointmentServiceError> {
        let request = self
            .repository
            .fetch_blood_request(request_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(request)
    }

    /// Blood requests posted by one hospital, newest first.
    pub fn hospital_blood_requests(
        &self,
        hospital_id: &HospitalId,
    ) -> Result<Vec<BloodRequest>, AppointmentServiceError> {
        Ok(self.repository.hospital_blood_requests(hospital_id)?)
    }

    /// Open requests across hospitals, most urgent first and newest first within an urgency.
    pub fn open_blood_requests(&self) -> Result<Vec<BloodRequest>, AppointmentServiceError> {
        let mut open = self.repository.open_blood_requests()?;
        open.sort_by(|left, right| right.urgency.cmp(&left.urgency));
        Ok(open)
    }

    pub fn close_blood_request(
        &self,
        request_id: &BloodRequestId,
        resolution: BloodRequestResolution,
        today: NaiveDate,
    ) -> Result<BloodRequest, AppointmentServiceError> {
        let request = self.blood_request(request_id)?;
        if !request.is_open() {
            return Err(RepositoryError::RequestNotOpen(request.status).into());
        }
        if today < request.created_on {
            return Err(AppointmentServiceError::DecisionBeforeRequest {
                created_on: request.created_on,
                decided_on: today,
            });
        }

        let closed = self.repository.close_blood_request(BloodRequestClosure {
            request_id: request_id.clone(),
            status: resolution.status(),
            closed_on: today,
        })?;
        info!(request_id = %request_id.0, status = %closed.status, "blood request closed");
        Ok(closed)
    }

    fn ensure_request_matches(
        &self,
        request_id: &BloodRequestId,
        appointment: &AppointmentRequest,
    ) -> Result<(), AppointmentServiceError> {
        let linked = self.blood_request(request_id)?;
        if linked.hospital_id != appointment.hospital_id {
            return Err(AppointmentServiceError::BloodRequestMismatch {
                request_id: request_id.clone(),
                reason: "request was posted by another hospital",
            });
        }
        if linked.donation_type != appointment.donation_type {
            return Err(AppointmentServiceError::BloodRequestMismatch {
                request_id: request_id.clone(),
                reason: "request asks for a different donation type",
            });
        }
        if !linked.is_open() {
            return Err(RepositoryError::RequestNotOpen(linked.status).into());
        }
        Ok(())
    }

    fn close(
        &self,
        appointment_id: &AppointmentId,
        next: AppointmentStatus,
        note: Option<String>,
        today: NaiveDate,
    ) -> Result<AppointmentRecord, AppointmentServiceError> {
        let record = self.get(appointment_id)?;
        ensure_pending(&record, next)?;
        ensure_not_before_request(&record, today)?;

        let updated = self.repository.transition(StatusTransition {
            appointment_id: appointment_id.clone(),
            expected: AppointmentStatus::Pending,
            next,
            decided_on: today,
            note,
        })?;
        info!(appointment_id = %appointment_id.0, status = %next, "appointment closed");

        let activity_type = format!("appointment_{}", next.label());
        self.publish(&updated, &activity_type, BTreeMap::new());
        Ok(updated)
    }

    // The state change is already committed; a failed audit write is logged, not surfaced.
    fn publish(
        &self,
        record: &AppointmentRecord,
        activity_type: &str,
        details: BTreeMap<String, String>,
    ) {
        let activity = HospitalActivity {
            activity_type: activity_type.to_string(),
            hospital_id: record.request.hospital_id.clone(),
            appointment_id: record.appointment_id.clone(),
            details,
        };
        if let Err(err) = self.activity.publish(activity) {
            warn!(
                appointment_id = %record.appointment_id.0,
                activity_type,
                error = %err,
                "failed to record hospital activity"
            );
        }
    }
}

fn ensure_pending(
    record: &AppointmentRecord,
    next: AppointmentStatus,
) -> Result<(), AppointmentServiceError> {
    if record.status == AppointmentStatus::Pending {
        Ok(())
    } else {
        Err(AppointmentServiceError::InvalidTransition {
            from: record.status,
            to: next,
        })
    }
}

fn ensure_not_before_request(
    record: &AppointmentRecord,
    decided_on: NaiveDate,
) -> Result<(), AppointmentServiceError> {
    if decided_on < record.created_on {
        Err(AppointmentServiceError::DecisionBeforeRequest {
            created_on: record.created_on,
            decided_on,
        })
    } else {
        Ok(())
    }
}

/// Error raised by the appointment service.
#[derive(Debug, thiserror::Error)]
pub enum AppointmentServiceError {
    #[error(transparent)]
    Eligibility(#[from] EligibilityError),
    #[error("appointment refused: {0}")]
    Rejected(#[from] RejectionReason),
    #[error("cannot move appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    #[error("requested date {requested} is before {today}")]
    RequestedDateInPast {
        requested: NaiveDate,
        today: NaiveDate,
    },
    #[error("decision dated {decided_on} precedes the request made on {created_on}")]
    DecisionBeforeRequest {
        created_on: NaiveDate,
        decided_on: NaiveDate,
    },
    #[error("invalid blood request: {0}")]
    InvalidBloodRequest(&'static str),
    #[error("cannot link blood request '{}': {reason}", .request_id.0)]
    BloodRequestMismatch {
        request_id: BloodRequestId,
        reason: &'static str,
    },
    #[error("appointment '{}' is {status}; only accepted donations can be verified", .appointment_id.0)]
    NotAccepted {
        appointment_id: AppointmentId,
        status: AppointmentStatus,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
