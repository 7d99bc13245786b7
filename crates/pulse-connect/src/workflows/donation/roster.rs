//! Bulk donor screening from spreadsheet exports.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use super::domain::{
    BloodType, DonationRecord, DonationType, DonorHealthProfile, DonorId, MedicalFlags,
};
use super::eligibility::{EligibilityError, EligibilityTracker, EligibilityVerdict};

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Row { line: usize, message: String },
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read donor roster: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid donor roster CSV: {}", err),
            RosterImportError::Row { line, message } => {
                write!(f, "donor roster line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::Row { .. } => None,
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub struct DonorRosterImporter;

impl DonorRosterImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Vec<DonorHealthProfile>, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse a roster with a header row. Line numbers in errors count the header as line 1.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<DonorHealthProfile>, RosterImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut profiles = Vec::new();

        for (index, record) in csv_reader.deserialize::<RosterRow>().enumerate() {
            let line = index + 2;
            let row = record?;
            let profile = row
                .into_profile()
                .map_err(|message| RosterImportError::Row { line, message })?;
            profiles.push(profile);
        }

        Ok(profiles)
    }
}

/// Per-donor screening result; malformed profiles do not abort the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterScreening {
    pub donor_id: DonorId,
    pub outcome: Result<EligibilityVerdict, EligibilityError>,
}

pub fn screen_roster(
    profiles: &[DonorHealthProfile],
    tracker: &EligibilityTracker,
    donation_type: DonationType,
    today: NaiveDate,
) -> Vec<RosterScreening> {
    profiles
        .iter()
        .map(|profile| RosterScreening {
            donor_id: profile.donor_id.clone(),
            outcome: tracker.evaluate(profile, donation_type, today),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    donor_id: String,
    age_years: i32,
    weight_kg: f64,
    blood_type: String,
    #[serde(default, deserialize_with = "flag")]
    has_diabetes: bool,
    #[serde(default, deserialize_with = "flag")]
    has_hypertension: bool,
    #[serde(default, deserialize_with = "flag")]
    has_heart_disease: bool,
    #[serde(default, deserialize_with = "flag")]
    is_pregnant: bool,
    #[serde(default, deserialize_with = "flag")]
    had_recent_surgery: bool,
    #[serde(default, deserialize_with = "flag")]
    had_recent_travel: bool,
    #[serde(default, deserialize_with = "flag")]
    had_recent_tattoo: bool,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    last_donation_date: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    last_donation_type: Option<String>,
}

impl RosterRow {
    fn into_profile(self) -> Result<DonorHealthProfile, String> {
        let blood_type: BloodType = self.blood_type.parse().map_err(|err| format!("{err}"))?;

        let last_donation = match (self.last_donation_date, self.last_donation_type) {
            (None, None) => None,
            (Some(date), Some(kind)) => {
                let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                    .map_err(|err| format!("last_donation_date '{date}' ({err})"))?;
                let donation_type: DonationType =
                    kind.parse().map_err(|err| format!("{err}"))?;
                Some(DonationRecord {
                    date,
                    donation_type,
                })
            }
            (Some(_), None) => {
                return Err("last_donation_date given without last_donation_type".to_string())
            }
            (None, Some(_)) => {
                return Err("last_donation_type given without last_donation_date".to_string())
            }
        };

        Ok(DonorHealthProfile {
            donor_id: DonorId(self.donor_id),
            age_years: self.age_years,
            weight_kg: self.weight_kg,
            blood_type,
            medical_flags: MedicalFlags {
                has_diabetes: self.has_diabetes,
                has_hypertension: self.has_hypertension,
                has_heart_disease: self.has_heart_disease,
                is_pregnant: self.is_pregnant,
                had_recent_surgery: self.had_recent_surgery,
                had_recent_travel: self.had_recent_travel,
                had_recent_tattoo: self.had_recent_tattoo,
            },
            last_donation,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "no" | "n" | "0" => Ok(false),
        "true" | "yes" | "y" | "1" => Ok(true),
        other => Err(serde::de::Error::custom(format!(
            "expected yes/no flag, found '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &str = "\
donor_id,age_years,weight_kg,blood_type,has_diabetes,has_hypertension,has_heart_disease,is_pregnant,had_recent_surgery,had_recent_travel,had_recent_tattoo,last_donation_date,last_donation_type
d-001,30,70,O+,no,no,no,no,no,no,no,2026-01-10,blood
d-002,17,48.5,ab-,,,,,,,,,
d-003,44,82,B+,yes,no,no,no,no,yes,no,2026-02-20,plasma
";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date")
    }

    #[test]
    fn parses_flags_blood_types_and_history() {
        let profiles = DonorRosterImporter::from_reader(ROSTER.as_bytes()).expect("roster parses");

        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[0].blood_type, BloodType::OPositive);
        assert_eq!(
            profiles[0].last_donation,
            Some(DonationRecord {
                date: NaiveDate::from_ymd_opt(2026, 1, 10).expect("valid"),
                donation_type: DonationType::Blood,
            })
        );
        assert_eq!(profiles[1].blood_type, BloodType::AbNegative);
        assert!(profiles[1].last_donation.is_none());
        assert!(profiles[2].medical_flags.has_diabetes);
        assert!(profiles[2].medical_flags.had_recent_travel);
    }

    #[test]
    fn reports_line_for_half_recorded_history() {
        let roster = "\
donor_id,age_years,weight_kg,blood_type,last_donation_date,last_donation_type
d-001,30,70,O+,2026-01-10,
";

        match DonorRosterImporter::from_reader(roster.as_bytes()) {
            Err(RosterImportError::Row { line, message }) => {
                assert_eq!(line, 2);
                assert!(message.contains("last_donation_type"));
            }
            other => panic!("expected row error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_blood_type() {
        let roster = "donor_id,age_years,weight_kg,blood_type\nd-009,30,70,C+\n";

        match DonorRosterImporter::from_reader(roster.as_bytes()) {
            Err(RosterImportError::Row { message, .. }) => {
                assert!(message.contains("blood type"))
            }
            other => panic!("expected row error, got {other:?}"),
        }
    }

    #[test]
    fn screening_keeps_going_past_malformed_profiles() {
        let mut profiles =
            DonorRosterImporter::from_reader(ROSTER.as_bytes()).expect("roster parses");
        profiles[0].weight_kg = 0.0;

        let results = screen_roster(
            &profiles,
            &EligibilityTracker::default(),
            DonationType::Blood,
            today(),
        );

        assert_eq!(results.len(), 3);
        assert!(matches!(
            results[0].outcome,
            Err(EligibilityError::InvalidProfile { .. })
        ));
        let minor = results[1].outcome.as_ref().expect("evaluates");
        assert!(!minor.is_eligible);
        let diabetic = results[2].outcome.as_ref().expect("evaluates");
        assert!(!diabetic.is_eligible);
    }
}
