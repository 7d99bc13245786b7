//! Donor eligibility and post-donation cooldown evaluation.
//!
//! Everything here is a pure function of the donor snapshot, the policy, and the evaluation
//! date. Callers recompute verdicts whenever they need one; nothing is cached or persisted.

mod policy;
mod rules;

pub use policy::{
    CooldownPolicy, PolicyProblem, DEFAULT_BLOOD_COOLDOWN_DAYS, DEFAULT_MAX_AGE_YEARS,
    DEFAULT_MIN_AGE_YEARS, DEFAULT_MIN_WEIGHT_KG_BLOOD, DEFAULT_MIN_WEIGHT_KG_PLASMA,
    DEFAULT_PLASMA_COOLDOWN_DAYS,
};
pub use rules::DisqualifyingReason;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{
    AppointmentRequest, DonationRecord, DonationType, DonorHealthProfile, DonorId,
};

/// Outcome of a single evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    pub donor_id: DonorId,
    pub donation_type: DonationType,
    pub evaluated_on: NaiveDate,
    pub is_eligible: bool,
    pub disqualifying_reasons: Vec<DisqualifyingReason>,
    pub next_eligible_date: NaiveDate,
}

impl EligibilityVerdict {
    pub fn first_reason(&self) -> Option<DisqualifyingReason> {
        self.disqualifying_reasons.first().copied()
    }

    pub fn summary(&self) -> String {
        if self.is_eligible {
            return format!("eligible to donate {} now", self.donation_type);
        }

        let codes: Vec<&str> = self
            .disqualifying_reasons
            .iter()
            .map(|reason| reason.code())
            .collect();
        format!(
            "not eligible to donate {} ({}); next eligible on {}",
            self.donation_type,
            codes.join(", "),
            self.next_eligible_date
        )
    }
}

/// Malformed input to the tracker. Disqualification is never an error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EligibilityError {
    #[error("invalid profile for donor '{}': {problem}", .donor_id.0)]
    InvalidProfile {
        donor_id: DonorId,
        problem: ProfileProblem,
    },
    #[error("invalid cooldown policy: {0}")]
    InvalidPolicy(PolicyProblem),
}

/// Describes which profile field is malformed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileProblem {
    #[error("weight must be a positive number of kilograms (found {0})")]
    NonPositiveWeight(f64),
    #[error("age must not be negative (found {0})")]
    NegativeAge(i32),
    #[error("last donation on {last_donation} is after the evaluation date {today}")]
    LastDonationInFuture {
        last_donation: NaiveDate,
        today: NaiveDate,
    },
}

/// Why an appointment request cannot be accepted right now.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RejectionReason {
    #[error("{}: {}", .reason.code(), .reason.summary())]
    Disqualified {
        reason: DisqualifyingReason,
        next_eligible_date: NaiveDate,
    },
    #[error("appointment was requested for donor '{}' but the profile belongs to '{}'", .requested.0, .profile.0)]
    DonorMismatch { requested: DonorId, profile: DonorId },
    #[error(transparent)]
    Evaluation(#[from] EligibilityError),
}

/// Checks that the profile can be evaluated at all on `today`.
pub fn validate_profile(
    profile: &DonorHealthProfile,
    today: NaiveDate,
) -> Result<(), EligibilityError> {
    let invalid = |problem| EligibilityError::InvalidProfile {
        donor_id: profile.donor_id.clone(),
        problem,
    };

    if !profile.weight_kg.is_finite() || profile.weight_kg <= 0.0 {
        return Err(invalid(ProfileProblem::NonPositiveWeight(profile.weight_kg)));
    }
    if profile.age_years < 0 {
        return Err(invalid(ProfileProblem::NegativeAge(profile.age_years)));
    }
    if let Some(last) = profile.last_donation {
        if last.date > today {
            return Err(invalid(ProfileProblem::LastDonationInFuture {
                last_donation: last.date,
                today,
            }));
        }
    }

    Ok(())
}

/// Evaluate whether the donor may give `donation_type` on `today`.
///
/// All six checks run and report in a fixed order so repeated calls with the same input
/// produce identical verdicts. The cooldown is keyed on the donor's previous donation type,
/// not on the type being requested.
pub fn evaluate(
    profile: &DonorHealthProfile,
    policy: &CooldownPolicy,
    donation_type: DonationType,
    today: NaiveDate,
) -> Result<EligibilityVerdict, EligibilityError> {
    policy.validate()?;
    validate_profile(profile, today)?;

    let (disqualifying_reasons, cooldown) =
        rules::collect_reasons(profile, policy, donation_type, today);

    let next_eligible_date = match cooldown {
        Some(signal) if signal.active() => signal.expires_on,
        _ => today,
    };

    Ok(EligibilityVerdict {
        donor_id: profile.donor_id.clone(),
        donation_type,
        evaluated_on: today,
        is_eligible: disqualifying_reasons.is_empty(),
        disqualifying_reasons,
        next_eligible_date,
    })
}

/// Gate used by the appointment workflow at request time and again at acceptance time.
pub fn can_accept_appointment(
    profile: &DonorHealthProfile,
    policy: &CooldownPolicy,
    request: &AppointmentRequest,
    today: NaiveDate,
) -> Result<(), RejectionReason> {
    if profile.donor_id != request.donor_id {
        return Err(RejectionReason::DonorMismatch {
            requested: request.donor_id.clone(),
            profile: profile.donor_id.clone(),
        });
    }

    let verdict = evaluate(profile, policy, request.donation_type, today)?;
    match verdict.first_reason() {
        None => Ok(()),
        Some(reason) => Err(RejectionReason::Disqualified {
            reason,
            next_eligible_date: verdict.next_eligible_date,
        }),
    }
}

/// Donation history entry written when a hospital accepts `request` on `accepted_on`.
pub fn recorded_donation(request: &AppointmentRequest, accepted_on: NaiveDate) -> DonationRecord {
    DonationRecord {
        date: accepted_on,
        donation_type: request.donation_type,
    }
}

/// Policy-bound wrapper so services validate the policy once at construction.
#[derive(Debug, Clone)]
pub struct EligibilityTracker {
    policy: CooldownPolicy,
}

impl EligibilityTracker {
    pub fn new(policy: CooldownPolicy) -> Result<Self, EligibilityError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &CooldownPolicy {
        &self.policy
    }

    pub fn evaluate(
        &self,
        profile: &DonorHealthProfile,
        donation_type: DonationType,
        today: NaiveDate,
    ) -> Result<EligibilityVerdict, EligibilityError> {
        evaluate(profile, &self.policy, donation_type, today)
    }

    pub fn can_accept(
        &self,
        profile: &DonorHealthProfile,
        request: &AppointmentRequest,
        today: NaiveDate,
    ) -> Result<(), RejectionReason> {
        can_accept_appointment(profile, &self.policy, request, today)
    }
}

impl Default for EligibilityTracker {
    fn default() -> Self {
        Self {
            policy: CooldownPolicy::default(),
        }
    }
}
