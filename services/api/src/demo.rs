use crate::infra::{InMemoryActivityLog, SimulatedLedger};
use chrono::{Local, NaiveDate};
use clap::Args;
use pulse_connect::config::AppConfig;
use pulse_connect::error::AppError;
use pulse_connect::workflows::donation::{
    screen_roster, AppointmentRequest, AppointmentService, BloodRequestResolution, BloodType,
    CooldownPolicy, DonationRecord, DonationType, DonorHealthProfile, DonorId,
    DonorRosterImporter, EligibilityTracker, EligibilityVerdict, HospitalId,
    InMemoryDonationStore, MedicalFlags, NewBloodRequest, RequestUrgency,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct CheckArgs {
    /// Donor identifier echoed in the verdict
    #[arg(long, default_value = "cli-donor")]
    pub(crate) donor_id: String,
    /// Donor age in whole years
    #[arg(long)]
    pub(crate) age: i32,
    /// Donor weight in kilograms
    #[arg(long)]
    pub(crate) weight: f64,
    /// ABO/Rh blood type, e.g. O+ or AB-
    #[arg(long, default_value = "O+")]
    pub(crate) blood_type: BloodType,
    /// Requested donation type (blood or plasma)
    #[arg(long, default_value = "blood")]
    pub(crate) donation_type: DonationType,
    /// Date of the previous donation (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date, requires = "last_donation_type")]
    pub(crate) last_donation_date: Option<NaiveDate>,
    /// Type of the previous donation (blood or plasma)
    #[arg(long, requires = "last_donation_date")]
    pub(crate) last_donation_type: Option<DonationType>,
    #[arg(long)]
    pub(crate) diabetes: bool,
    #[arg(long)]
    pub(crate) hypertension: bool,
    #[arg(long)]
    pub(crate) heart_disease: bool,
    #[arg(long)]
    pub(crate) pregnant: bool,
    #[arg(long)]
    pub(crate) recent_surgery: bool,
    /// Evaluation date (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct ScreenArgs {
    /// CSV export with one donor per row
    #[arg(long)]
    pub(crate) roster: PathBuf,
    /// Donation type every donor is screened for
    #[arg(long, default_value = "blood")]
    pub(crate) donation_type: DonationType,
    /// Evaluation date (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the demo date (defaults to today).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Skip the ledger verification step.
    #[arg(long)]
    pub(crate) skip_verification: bool,
}

fn load_policy() -> Result<CooldownPolicy, AppError> {
    Ok(AppConfig::load()?.eligibility)
}

pub(crate) fn run_eligibility_check(args: CheckArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let tracker = EligibilityTracker::new(load_policy()?)?;
    let last_donation = match (args.last_donation_date, args.last_donation_type) {
        (Some(date), Some(donation_type)) => Some(DonationRecord {
            date,
            donation_type,
        }),
        _ => None,
    };

    let profile = DonorHealthProfile {
        donor_id: DonorId(args.donor_id),
        age_years: args.age,
        weight_kg: args.weight,
        blood_type: args.blood_type,
        medical_flags: MedicalFlags {
            has_diabetes: args.diabetes,
            has_hypertension: args.hypertension,
            has_heart_disease: args.heart_disease,
            is_pregnant: args.pregnant,
            had_recent_surgery: args.recent_surgery,
            ..MedicalFlags::default()
        },
        last_donation,
    };

    let verdict = tracker.evaluate(&profile, args.donation_type, today)?;
    render_verdict(&profile, &verdict);
    Ok(())
}

pub(crate) fn run_roster_screen(args: ScreenArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let tracker = EligibilityTracker::new(load_policy()?)?;
    let profiles = DonorRosterImporter::from_path(&args.roster)?;

    println!(
        "Screening {} donors for {} on {}",
        profiles.len(),
        args.donation_type,
        today
    );

    let mut eligible = 0usize;
    let mut invalid = 0usize;
    for screening in screen_roster(&profiles, &tracker, args.donation_type, today) {
        match screening.outcome {
            Ok(verdict) if verdict.is_eligible => {
                eligible += 1;
                println!("- {}: eligible", screening.donor_id.0);
            }
            Ok(verdict) => println!(
                "- {}: ineligible ({}) | next eligible {}",
                screening.donor_id.0,
                reason_codes(&verdict),
                verdict.next_eligible_date
            ),
            Err(err) => {
                invalid += 1;
                println!("- {}: skipped ({})", screening.donor_id.0, err);
            }
        }
    }

    println!(
        "\n{} eligible | {} ineligible | {} malformed",
        eligible,
        profiles.len() - eligible - invalid,
        invalid
    );
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let policy = load_policy()?;

    println!("PulseConnect donation demo ({today})");
    println!(
        "Policy: blood cooldown {} days | plasma cooldown {} days | age {}-{} | weight >= {} kg blood, {} kg plasma",
        policy.blood_cooldown_days,
        policy.plasma_cooldown_days,
        policy.min_age_years,
        policy.max_age_years,
        policy.min_weight_kg_blood,
        policy.min_weight_kg_plasma
    );

    let store = Arc::new(InMemoryDonationStore::default());
    let activity = Arc::new(InMemoryActivityLog::default());
    let ledger = Arc::new(SimulatedLedger::default());
    let service = AppointmentService::new(store, activity.clone(), ledger.clone(), policy)?;

    let donor = DonorHealthProfile {
        donor_id: DonorId("donor-ayesha".to_string()),
        age_years: 29,
        weight_kg: 58.5,
        blood_type: BloodType::BPositive,
        medical_flags: MedicalFlags {
            had_recent_travel: true,
            ..MedicalFlags::default()
        },
        last_donation: Some(DonationRecord {
            date: today - chrono::Duration::days(90),
            donation_type: DonationType::Blood,
        }),
    };

    let donor = match service.register_donor(donor, today) {
        Ok(donor) => donor,
        Err(err) => {
            println!("  Registration failed: {}", err);
            return Ok(());
        }
    };
    println!("\nRegistered donor {}", donor.donor_id.0);

    for donation_type in [DonationType::Blood, DonationType::Plasma] {
        match service.eligibility(&donor.donor_id, donation_type, today) {
            Ok(verdict) => render_verdict(&donor, &verdict),
            Err(err) => println!("  Eligibility unavailable: {}", err),
        }
    }

    let hospital = HospitalId("hosp-city-general".to_string());
    let need = match service.create_blood_request(
        hospital.clone(),
        NewBloodRequest {
            patient_name: "Ward 7 burns patient".to_string(),
            blood_type: donor.blood_type,
            donation_type: DonationType::Plasma,
            quantity_ml: 600,
            urgency: RequestUrgency::Emergency,
            location: Some("City General, burns unit".to_string()),
            description: None,
        },
        today,
    ) {
        Ok(need) => need,
        Err(err) => {
            println!("  Blood request refused: {}", err);
            return Ok(());
        }
    };
    println!(
        "\n{} posted {} ({} {} ml, {})",
        need.hospital_id.0, need.request_id.0, need.blood_type, need.quantity_ml, need.urgency
    );

    let request = AppointmentRequest {
        donor_id: donor.donor_id.clone(),
        hospital_id: hospital.clone(),
        donation_type: DonationType::Plasma,
        requested_date: today,
        request_id: Some(need.request_id.clone()),
    };
    let record = match service.request_appointment(request, today) {
        Ok(record) => record,
        Err(err) => {
            println!("  Appointment refused: {}", err);
            return Ok(());
        }
    };
    println!(
        "\nRequested {} at {} -> {} ({})",
        record.request.donation_type,
        record.request.hospital_id.0,
        record.appointment_id.0,
        record.status
    );

    let outcome = match service.accept(&record.appointment_id, today) {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("  Acceptance refused: {}", err);
            return Ok(());
        }
    };
    println!(
        "Hospital accepted {} | donor may give plasma again on {}",
        outcome.appointment.appointment_id.0, outcome.next_eligible_date
    );

    match service.close_blood_request(&need.request_id, BloodRequestResolution::Fulfilled, today) {
        Ok(closed) => println!("Blood request {} is {}", closed.request_id.0, closed.status),
        Err(err) => println!("  Closing blood request failed: {}", err),
    }

    let follow_up = AppointmentRequest {
        donor_id: donor.donor_id.clone(),
        hospital_id: hospital,
        donation_type: DonationType::Blood,
        requested_date: today + chrono::Duration::days(7),
        request_id: None,
    };
    match service.request_appointment(follow_up, today) {
        Ok(record) => println!("Follow-up booked unexpectedly: {}", record.appointment_id.0),
        Err(err) => println!("Follow-up blood request a week later refused: {}", err),
    }

    if !args.skip_verification {
        match service.verify_donation(&record.appointment_id, today) {
            Ok(verified) => {
                if let Some(receipt) = verified.ledger_receipt {
                    println!(
                        "Ledger verification on {}: {}",
                        receipt.network, receipt.tx_hash
                    );
                }
                println!("Ledger submissions: {}", ledger.submission_count());
            }
            Err(err) => println!("  Ledger verification failed: {}", err),
        }
    }

    match service.get(&record.appointment_id) {
        Ok(stored) => match serde_json::to_string_pretty(&stored.status_view()) {
            Ok(json) => println!("\nPublic status payload:\n{}", json),
            Err(err) => println!("\nPublic status payload unavailable: {}", err),
        },
        Err(err) => println!("\nStore lookup failed: {}", err),
    }

    let events = activity.events();
    if events.is_empty() {
        println!("\nHospital activity: none recorded");
    } else {
        println!("\nHospital activity");
        for event in events {
            println!(
                "- {} | {} | {}",
                event.activity_type, event.hospital_id.0, event.appointment_id.0
            );
        }
    }

    Ok(())
}

fn reason_codes(verdict: &EligibilityVerdict) -> String {
    verdict
        .disqualifying_reasons
        .iter()
        .map(|reason| reason.code())
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_verdict(profile: &DonorHealthProfile, verdict: &EligibilityVerdict) {
    println!(
        "{} ({}, {} kg, {}) for {} on {}",
        profile.donor_id.0,
        profile.age_years,
        profile.weight_kg,
        profile.blood_type,
        verdict.donation_type,
        verdict.evaluated_on
    );
    if verdict.is_eligible {
        println!("  Eligible");
    } else {
        println!("  Ineligible: {}", reason_codes(verdict));
        for reason in &verdict.disqualifying_reasons {
            println!("    - {}", reason.summary());
        }
    }
    println!("  Next eligible date: {}", verdict.next_eligible_date);
}
