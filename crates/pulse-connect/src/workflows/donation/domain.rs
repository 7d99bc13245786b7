use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for registered donors.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DonorId(pub String);

/// Identifier wrapper for partner hospitals.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HospitalId(pub String);

/// Identifier wrapper for appointment requests.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AppointmentId(pub String);

/// Identifier wrapper for hospital blood requests.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BloodRequestId(pub String);

/// Kind of donation a donor gives or requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationType {
    Blood,
    Plasma,
}

impl DonationType {
    pub const fn label(self) -> &'static str {
        match self {
            DonationType::Blood => "blood",
            DonationType::Plasma => "plasma",
        }
    }
}

impl fmt::Display for DonationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DonationType {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "blood" | "whole_blood" => Ok(Self::Blood),
            "plasma" => Ok(Self::Plasma),
            other => Err(UnknownValue {
                kind: "donation type",
                value: other.to_string(),
            }),
        }
    }
}

/// ABO group combined with the Rh factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodType {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodType {
    pub const ALL: [BloodType; 8] = [
        BloodType::APositive,
        BloodType::ANegative,
        BloodType::BPositive,
        BloodType::BNegative,
        BloodType::AbPositive,
        BloodType::AbNegative,
        BloodType::OPositive,
        BloodType::ONegative,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            BloodType::APositive => "A+",
            BloodType::ANegative => "A-",
            BloodType::BPositive => "B+",
            BloodType::BNegative => "B-",
            BloodType::AbPositive => "AB+",
            BloodType::AbNegative => "AB-",
            BloodType::OPositive => "O+",
            BloodType::ONegative => "O-",
        }
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BloodType {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        BloodType::ALL
            .into_iter()
            .find(|blood_type| blood_type.label() == normalized)
            .ok_or_else(|| UnknownValue {
                kind: "blood type",
                value: value.trim().to_string(),
            })
    }
}

/// Raised when free-form input does not name a known enum member.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

/// Self-declared health answers from the intake questionnaire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedicalFlags {
    pub has_diabetes: bool,
    pub has_hypertension: bool,
    pub has_heart_disease: bool,
    pub is_pregnant: bool,
    pub had_recent_surgery: bool,
    pub had_recent_travel: bool,
    pub had_recent_tattoo: bool,
}

impl MedicalFlags {
    pub fn has_chronic_condition(&self) -> bool {
        self.has_diabetes || self.has_hypertension || self.has_heart_disease
    }
}

/// Most recent completed donation. Date and type are always recorded together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRecord {
    pub date: NaiveDate,
    pub donation_type: DonationType,
}

/// Snapshot of everything eligibility depends on for one donor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorHealthProfile {
    pub donor_id: DonorId,
    pub age_years: i32,
    pub weight_kg: f64,
    pub blood_type: BloodType,
    #[serde(default)]
    pub medical_flags: MedicalFlags,
    #[serde(default)]
    pub last_donation: Option<DonationRecord>,
}

impl DonorHealthProfile {
    /// Apply a refreshed questionnaire without touching donation history.
    pub fn apply_intake(&mut self, intake: HealthIntake) {
        self.age_years = intake.age_years;
        self.weight_kg = intake.weight_kg;
        self.blood_type = intake.blood_type;
        self.medical_flags = intake.medical_flags;
    }
}

/// Questionnaire payload used to refresh a stored profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthIntake {
    pub age_years: i32,
    pub weight_kg: f64,
    pub blood_type: BloodType,
    #[serde(default)]
    pub medical_flags: MedicalFlags,
}

/// Donor-submitted request for a donation slot at a hospital.
///
/// `request_id` links the slot to an open blood request posted by the same hospital.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRequest {
    pub donor_id: DonorId,
    pub hospital_id: HospitalId,
    pub donation_type: DonationType,
    pub requested_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<BloodRequestId>,
}

/// Lifecycle tracked for each appointment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Accepted,
    Rejected,
    Discarded,
}

impl AppointmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Accepted => "accepted",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Discarded => "discarded",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, AppointmentStatus::Pending)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How quickly a hospital needs a blood request filled. Ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestUrgency {
    Low,
    Medium,
    High,
    #[serde(alias = "critical")]
    Emergency,
}

impl RequestUrgency {
    pub const fn label(self) -> &'static str {
        match self {
            RequestUrgency::Low => "low",
            RequestUrgency::Medium => "medium",
            RequestUrgency::High => "high",
            RequestUrgency::Emergency => "emergency",
        }
    }
}

impl fmt::Display for RequestUrgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RequestUrgency {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "emergency" | "critical" => Ok(Self::Emergency),
            other => Err(UnknownValue {
                kind: "urgency",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle of a hospital blood request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BloodRequestStatus {
    Open,
    Fulfilled,
    Cancelled,
}

impl BloodRequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            BloodRequestStatus::Open => "open",
            BloodRequestStatus::Fulfilled => "fulfilled",
            BloodRequestStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BloodRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a hospital closes one of its blood requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BloodRequestResolution {
    #[default]
    Fulfilled,
    Cancelled,
}

impl BloodRequestResolution {
    pub const fn status(self) -> BloodRequestStatus {
        match self {
            BloodRequestResolution::Fulfilled => BloodRequestStatus::Fulfilled,
            BloodRequestResolution::Cancelled => BloodRequestStatus::Cancelled,
        }
    }
}

/// Hospital-submitted need for blood or plasma. Emergencies use `RequestUrgency::Emergency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBloodRequest {
    pub patient_name: String,
    pub blood_type: BloodType,
    #[serde(default = "default_request_type")]
    pub donation_type: DonationType,
    pub quantity_ml: u32,
    pub urgency: RequestUrgency,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_request_type() -> DonationType {
    DonationType::Blood
}

/// Stored blood request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodRequest {
    pub request_id: BloodRequestId,
    pub hospital_id: HospitalId,
    pub patient_name: String,
    pub blood_type: BloodType,
    pub donation_type: DonationType,
    pub quantity_ml: u32,
    pub urgency: RequestUrgency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: BloodRequestStatus,
    pub created_on: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_on: Option<NaiveDate>,
}

impl BloodRequest {
    pub fn open(
        request_id: BloodRequestId,
        hospital_id: HospitalId,
        submission: NewBloodRequest,
        created_on: NaiveDate,
    ) -> Self {
        Self {
            request_id,
            hospital_id,
            patient_name: submission.patient_name,
            blood_type: submission.blood_type,
            donation_type: submission.donation_type,
            quantity_ml: submission.quantity_ml,
            urgency: submission.urgency,
            location: submission.location,
            description: submission.description,
            status: BloodRequestStatus::Open,
            created_on,
            closed_on: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == BloodRequestStatus::Open
    }
}
