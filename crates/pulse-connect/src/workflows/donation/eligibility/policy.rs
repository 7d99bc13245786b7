use serde::{Deserialize, Serialize};

use super::super::domain::{DonationRecord, DonationType};
use super::EligibilityError;

pub const DEFAULT_BLOOD_COOLDOWN_DAYS: i64 = 56;
pub const DEFAULT_PLASMA_COOLDOWN_DAYS: i64 = 14;
pub const DEFAULT_MIN_AGE_YEARS: i32 = 18;
pub const DEFAULT_MAX_AGE_YEARS: i32 = 65;
pub const DEFAULT_MIN_WEIGHT_KG_BLOOD: f64 = 50.0;
pub const DEFAULT_MIN_WEIGHT_KG_PLASMA: f64 = 55.0;

/// Thresholds applied by the eligibility tracker. Loaded once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownPolicy {
    pub blood_cooldown_days: i64,
    pub plasma_cooldown_days: i64,
    pub min_age_years: i32,
    pub max_age_years: i32,
    pub min_weight_kg_blood: f64,
    pub min_weight_kg_plasma: f64,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            blood_cooldown_days: DEFAULT_BLOOD_COOLDOWN_DAYS,
            plasma_cooldown_days: DEFAULT_PLASMA_COOLDOWN_DAYS,
            min_age_years: DEFAULT_MIN_AGE_YEARS,
            max_age_years: DEFAULT_MAX_AGE_YEARS,
            min_weight_kg_blood: DEFAULT_MIN_WEIGHT_KG_BLOOD,
            min_weight_kg_plasma: DEFAULT_MIN_WEIGHT_KG_PLASMA,
        }
    }
}

impl CooldownPolicy {
    /// Recovery period owed after `previous`, keyed on what was donated last time.
    pub fn cooldown_days_after(&self, previous: DonationType) -> i64 {
        match previous {
            DonationType::Blood => self.blood_cooldown_days,
            DonationType::Plasma => self.plasma_cooldown_days,
        }
    }

    pub fn cooldown_for(&self, record: &DonationRecord) -> i64 {
        self.cooldown_days_after(record.donation_type)
    }

    pub fn min_weight_kg_for(&self, requested: DonationType) -> f64 {
        match requested {
            DonationType::Blood => self.min_weight_kg_blood,
            DonationType::Plasma => self.min_weight_kg_plasma,
        }
    }

    pub fn validate(&self) -> Result<(), EligibilityError> {
        let integral_thresholds = [
            ("blood_cooldown_days", self.blood_cooldown_days),
            ("plasma_cooldown_days", self.plasma_cooldown_days),
            ("min_age_years", i64::from(self.min_age_years)),
            ("max_age_years", i64::from(self.max_age_years)),
        ];
        for (field, value) in integral_thresholds {
            if value < 0 {
                return Err(EligibilityError::InvalidPolicy(PolicyProblem::Negative {
                    field,
                }));
            }
        }

        for (field, weight) in [
            ("min_weight_kg_blood", self.min_weight_kg_blood),
            ("min_weight_kg_plasma", self.min_weight_kg_plasma),
        ] {
            if !weight.is_finite() {
                return Err(EligibilityError::InvalidPolicy(PolicyProblem::NonFinite {
                    field,
                }));
            }
            if weight < 0.0 {
                return Err(EligibilityError::InvalidPolicy(PolicyProblem::Negative {
                    field,
                }));
            }
        }

        if self.min_age_years > self.max_age_years {
            return Err(EligibilityError::InvalidPolicy(
                PolicyProblem::InvertedAgeRange {
                    min: self.min_age_years,
                    max: self.max_age_years,
                },
            ));
        }

        Ok(())
    }
}

/// Describes which policy threshold is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyProblem {
    #[error("{field} must not be negative")]
    Negative { field: &'static str },
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("min_age_years ({min}) exceeds max_age_years ({max})")]
    InvertedAgeRange { min: i32, max: i32 },
}
