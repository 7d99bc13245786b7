use super::common::*;
use crate::workflows::donation::domain::{DonationType, DonorId, MedicalFlags};
use crate::workflows::donation::eligibility::{
    can_accept_appointment, evaluate, CooldownPolicy, DisqualifyingReason, EligibilityError,
    EligibilityTracker, PolicyProblem, ProfileProblem, RejectionReason,
};

use DisqualifyingReason::*;

fn policy() -> CooldownPolicy {
    CooldownPolicy::default()
}

#[test]
fn never_donated_has_no_cooldown_and_is_eligible_today() {
    let profile = healthy_profile("d-new");

    for donation_type in [DonationType::Blood, DonationType::Plasma] {
        let verdict = evaluate(&profile, &policy(), donation_type, today()).expect("evaluates");
        assert!(verdict.is_eligible);
        assert!(!verdict.disqualifying_reasons.contains(&CooldownActive));
        assert_eq!(verdict.next_eligible_date, today());
    }
}

#[test]
fn evaluation_is_idempotent_for_identical_input() {
    let mut profile = donated("d-repeat", DonationType::Blood, days_after(today(), -10));
    profile.age_years = 70;
    profile.medical_flags.is_pregnant = true;

    let first = evaluate(&profile, &policy(), DonationType::Blood, today()).expect("evaluates");
    let second = evaluate(&profile, &policy(), DonationType::Blood, today()).expect("evaluates");

    assert_eq!(first, second);
}

#[test]
fn blood_cooldown_expires_on_day_fifty_six() {
    let last = day(2026, 1, 5);
    let profile = donated("d-blood", DonationType::Blood, last);

    let day_55 = evaluate(&profile, &policy(), DonationType::Blood, days_after(last, 55))
        .expect("evaluates");
    assert_eq!(day_55.disqualifying_reasons, vec![CooldownActive]);
    assert_eq!(day_55.next_eligible_date, days_after(last, 56));

    let day_56 = evaluate(&profile, &policy(), DonationType::Blood, days_after(last, 56))
        .expect("evaluates");
    assert!(!day_56.disqualifying_reasons.contains(&CooldownActive));
    assert!(day_56.is_eligible);
    assert_eq!(day_56.next_eligible_date, days_after(last, 56));
}

#[test]
fn plasma_cooldown_expires_on_day_fourteen() {
    let last = day(2026, 3, 1);
    let profile = donated("d-plasma", DonationType::Plasma, last);

    let day_13 = evaluate(&profile, &policy(), DonationType::Plasma, days_after(last, 13))
        .expect("evaluates");
    assert!(!day_13.is_eligible);
    assert_eq!(day_13.next_eligible_date, days_after(last, 14));

    let day_14 = evaluate(&profile, &policy(), DonationType::Plasma, days_after(last, 14))
        .expect("evaluates");
    assert!(day_14.is_eligible);
}

#[test]
fn cooldown_follows_previous_donation_type_not_requested_type() {
    let last = day(2026, 3, 1);
    let after_plasma = donated("d-switch", DonationType::Plasma, last);

    let verdict = evaluate(
        &after_plasma,
        &policy(),
        DonationType::Blood,
        days_after(last, 20),
    )
    .expect("evaluates");
    assert!(verdict.is_eligible, "plasma recovery is 14 days even when blood is requested");

    let after_blood = donated("d-switch", DonationType::Blood, last);
    let verdict = evaluate(
        &after_blood,
        &policy(),
        DonationType::Plasma,
        days_after(last, 20),
    )
    .expect("evaluates");
    assert_eq!(verdict.disqualifying_reasons, vec![CooldownActive]);
    assert_eq!(verdict.next_eligible_date, days_after(last, 56));
}

#[test]
fn age_bounds_are_inclusive() {
    for (age, out_of_range) in [(17, true), (18, false), (65, false), (66, true)] {
        let mut profile = healthy_profile("d-age");
        profile.age_years = age;
        let verdict = evaluate(&profile, &policy(), DonationType::Blood, today()).expect("evaluates");
        assert_eq!(
            verdict.disqualifying_reasons.contains(&AgeOutOfRange),
            out_of_range,
            "age {age}"
        );
    }
}

#[test]
fn age_out_of_range_is_reported_regardless_of_other_fields() {
    let mut profile = donated("d-teen", DonationType::Blood, days_after(today(), -3));
    profile.age_years = 17;
    profile.weight_kg = 45.0;
    profile.medical_flags.has_heart_disease = true;

    let verdict = evaluate(&profile, &policy(), DonationType::Plasma, today()).expect("evaluates");

    assert_eq!(verdict.first_reason(), Some(AgeOutOfRange));
}

#[test]
fn weight_threshold_depends_on_requested_type() {
    let cases = [
        (49.0, DonationType::Blood, true),
        (49.0, DonationType::Plasma, true),
        (52.0, DonationType::Plasma, true),
        (52.0, DonationType::Blood, false),
        (55.0, DonationType::Plasma, false),
    ];

    for (weight, donation_type, underweight) in cases {
        let mut profile = healthy_profile("d-weight");
        profile.weight_kg = weight;
        let verdict = evaluate(&profile, &policy(), donation_type, today()).expect("evaluates");
        assert_eq!(
            verdict.disqualifying_reasons.contains(&WeightBelowMinimum),
            underweight,
            "{weight} kg requesting {donation_type}"
        );
    }
}

#[test]
fn every_reason_is_reported_in_fixed_order() {
    let last = days_after(today(), -5);
    let mut profile = donated("d-all", DonationType::Blood, last);
    profile.age_years = 70;
    profile.weight_kg = 40.0;
    profile.medical_flags = MedicalFlags {
        has_diabetes: true,
        has_hypertension: true,
        has_heart_disease: false,
        is_pregnant: true,
        had_recent_surgery: true,
        had_recent_travel: true,
        had_recent_tattoo: true,
    };

    let verdict = evaluate(&profile, &policy(), DonationType::Blood, today()).expect("evaluates");

    assert_eq!(
        verdict.disqualifying_reasons,
        vec![
            AgeOutOfRange,
            WeightBelowMinimum,
            MedicalCondition,
            Pregnancy,
            RecentSurgery,
            CooldownActive,
        ]
    );
    assert_eq!(verdict.next_eligible_date, days_after(last, 56));
    assert!(verdict.summary().contains("AGE_OUT_OF_RANGE"));
}

#[test]
fn pregnancy_reason_describes_only_the_recorded_flag() {
    let mut profile = healthy_profile("d-expecting");
    profile.medical_flags.is_pregnant = true;

    let verdict = evaluate(&profile, &policy(), DonationType::Plasma, today()).expect("evaluates");

    assert_eq!(verdict.disqualifying_reasons, vec![Pregnancy]);
    assert_eq!(Pregnancy.summary(), "donor is pregnant");
}

#[test]
fn travel_and_tattoo_flags_do_not_disqualify() {
    let mut profile = healthy_profile("d-travel");
    profile.medical_flags.had_recent_travel = true;
    profile.medical_flags.had_recent_tattoo = true;

    let verdict = evaluate(&profile, &policy(), DonationType::Blood, today()).expect("evaluates");

    assert!(verdict.is_eligible);
}

#[test]
fn next_eligible_date_is_today_when_ineligible_for_other_reasons() {
    let mut profile = donated("d-flagged", DonationType::Blood, days_after(today(), -90));
    profile.medical_flags.had_recent_surgery = true;

    let verdict = evaluate(&profile, &policy(), DonationType::Blood, today()).expect("evaluates");

    assert_eq!(verdict.disqualifying_reasons, vec![RecentSurgery]);
    assert_eq!(verdict.next_eligible_date, today());
}

#[test]
fn plasma_after_old_blood_donation_is_eligible() {
    let profile = donated("d-e2e", DonationType::Blood, days_after(today(), -90));

    let verdict = evaluate(&profile, &policy(), DonationType::Plasma, today()).expect("evaluates");

    assert!(verdict.is_eligible);
    assert!(verdict.disqualifying_reasons.is_empty());
    assert_eq!(verdict.next_eligible_date, today());
}

#[test]
fn malformed_profiles_fail_instead_of_disqualifying() {
    let mut weightless = healthy_profile("d-zero");
    weightless.weight_kg = 0.0;
    match evaluate(&weightless, &policy(), DonationType::Blood, today()) {
        Err(EligibilityError::InvalidProfile {
            donor_id,
            problem: ProfileProblem::NonPositiveWeight(_),
        }) => assert_eq!(donor_id, DonorId("d-zero".to_string())),
        other => panic!("expected invalid weight, got {other:?}"),
    }

    let mut negative_age = healthy_profile("d-neg");
    negative_age.age_years = -1;
    assert!(matches!(
        evaluate(&negative_age, &policy(), DonationType::Blood, today()),
        Err(EligibilityError::InvalidProfile {
            problem: ProfileProblem::NegativeAge(-1),
            ..
        })
    ));

    let future = donated("d-future", DonationType::Blood, days_after(today(), 1));
    assert!(matches!(
        evaluate(&future, &policy(), DonationType::Blood, today()),
        Err(EligibilityError::InvalidProfile {
            problem: ProfileProblem::LastDonationInFuture { .. },
            ..
        })
    ));
}

#[test]
fn negative_thresholds_are_invalid_policy() {
    let mut negative = policy();
    negative.plasma_cooldown_days = -1;

    match evaluate(&healthy_profile("d-1"), &negative, DonationType::Plasma, today()) {
        Err(EligibilityError::InvalidPolicy(PolicyProblem::Negative { field })) => {
            assert_eq!(field, "plasma_cooldown_days")
        }
        other => panic!("expected invalid policy, got {other:?}"),
    }

    let mut light = policy();
    light.min_weight_kg_blood = -50.0;
    assert!(EligibilityTracker::new(light).is_err());

    let mut inverted = policy();
    inverted.min_age_years = 70;
    assert!(matches!(
        inverted.validate(),
        Err(EligibilityError::InvalidPolicy(
            PolicyProblem::InvertedAgeRange { .. }
        ))
    ));
}

#[test]
fn can_accept_rejects_with_first_reason_in_order() {
    let mut profile = donated("d-gate", DonationType::Blood, days_after(today(), -10));
    profile.medical_flags.is_pregnant = true;
    profile.medical_flags.had_recent_surgery = true;
    let request = appointment_request("d-gate", DonationType::Blood, today());

    match can_accept_appointment(&profile, &policy(), &request, today()) {
        Err(RejectionReason::Disqualified {
            reason,
            next_eligible_date,
        }) => {
            assert_eq!(reason, Pregnancy);
            assert_eq!(next_eligible_date, days_after(today(), 46));
        }
        other => panic!("expected pregnancy rejection, got {other:?}"),
    }
}

#[test]
fn can_accept_approves_eligible_donor() {
    let profile = donated("d-ok", DonationType::Plasma, days_after(today(), -14));
    let request = appointment_request("d-ok", DonationType::Plasma, today());

    assert_eq!(
        can_accept_appointment(&profile, &policy(), &request, today()),
        Ok(())
    );
}

#[test]
fn can_accept_refuses_requests_for_another_donor() {
    let profile = healthy_profile("d-one");
    let request = appointment_request("d-two", DonationType::Blood, today());

    assert!(matches!(
        can_accept_appointment(&profile, &policy(), &request, today()),
        Err(RejectionReason::DonorMismatch { .. })
    ));
}

#[test]
fn custom_policy_thresholds_apply() {
    let tracker = EligibilityTracker::new(CooldownPolicy {
        blood_cooldown_days: 84,
        ..CooldownPolicy::default()
    })
    .expect("valid policy");
    let last = day(2026, 1, 1);
    let profile = donated("d-custom", DonationType::Blood, last);

    let verdict = tracker
        .evaluate(&profile, DonationType::Blood, days_after(last, 60))
        .expect("evaluates");

    assert_eq!(verdict.next_eligible_date, days_after(last, 84));
}
