use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::super::domain::{DonationType, DonorHealthProfile};
use super::policy::CooldownPolicy;

/// Reason codes reported by the tracker. Declaration order is evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisqualifyingReason {
    AgeOutOfRange,
    WeightBelowMinimum,
    MedicalCondition,
    Pregnancy,
    RecentSurgery,
    CooldownActive,
}

impl DisqualifyingReason {
    pub const fn code(self) -> &'static str {
        match self {
            DisqualifyingReason::AgeOutOfRange => "AGE_OUT_OF_RANGE",
            DisqualifyingReason::WeightBelowMinimum => "WEIGHT_BELOW_MINIMUM",
            DisqualifyingReason::MedicalCondition => "MEDICAL_CONDITION",
            DisqualifyingReason::Pregnancy => "PREGNANCY",
            DisqualifyingReason::RecentSurgery => "RECENT_SURGERY",
            DisqualifyingReason::CooldownActive => "COOLDOWN_ACTIVE",
        }
    }

    pub fn summary(self) -> String {
        match self {
            DisqualifyingReason::AgeOutOfRange => "donor age is outside the permitted range",
            DisqualifyingReason::WeightBelowMinimum => {
                "donor weight is below the minimum for this donation type"
            }
            DisqualifyingReason::MedicalCondition => {
                "declared diabetes, hypertension, or heart disease"
            }
            DisqualifyingReason::Pregnancy => "donor is pregnant",
            DisqualifyingReason::RecentSurgery => "donor had surgery recently",
            DisqualifyingReason::CooldownActive => "recovery period from the last donation",
        }
        .to_string()
    }
}

pub(crate) struct CooldownSignal {
    pub elapsed_days: i64,
    pub required_days: i64,
    pub expires_on: NaiveDate,
}

impl CooldownSignal {
    pub fn active(&self) -> bool {
        self.elapsed_days < self.required_days
    }
}

pub(crate) fn collect_reasons(
    profile: &DonorHealthProfile,
    policy: &CooldownPolicy,
    requested: DonationType,
    today: NaiveDate,
) -> (Vec<DisqualifyingReason>, Option<CooldownSignal>) {
    let mut reasons = Vec::new();

    if profile.age_years < policy.min_age_years || profile.age_years > policy.max_age_years {
        reasons.push(DisqualifyingReason::AgeOutOfRange);
    }

    if profile.weight_kg < policy.min_weight_kg_for(requested) {
        reasons.push(DisqualifyingReason::WeightBelowMinimum);
    }

    let flags = &profile.medical_flags;
    if flags.has_chronic_condition() {
        reasons.push(DisqualifyingReason::MedicalCondition);
    }
    if flags.is_pregnant {
        reasons.push(DisqualifyingReason::Pregnancy);
    }
    if flags.had_recent_surgery {
        reasons.push(DisqualifyingReason::RecentSurgery);
    }

    let cooldown = profile.last_donation.map(|last| {
        let required_days = policy.cooldown_for(&last);
        let expires_on = last
            .date
            .checked_add_days(Days::new(required_days.unsigned_abs()))
            .unwrap_or(NaiveDate::MAX);
        CooldownSignal {
            elapsed_days: today.signed_duration_since(last.date).num_days(),
            required_days,
            expires_on,
        }
    });

    if cooldown.as_ref().is_some_and(CooldownSignal::active) {
        reasons.push(DisqualifyingReason::CooldownActive);
    }

    (reasons, cooldown)
}
