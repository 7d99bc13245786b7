pub mod appointments;
pub mod domain;
pub mod eligibility;
pub mod ledger;
pub mod roster;

#[cfg(test)]
mod tests;

pub use appointments::{
    donation_router, donation_router_with_clock, AcceptanceOutcome, AppointmentRecord,
    AppointmentService, AppointmentServiceError, Clock, FixedClock, InMemoryDonationStore,
    SystemClock,
};
pub use domain::{
    AppointmentId, AppointmentRequest, AppointmentStatus, BloodRequest, BloodRequestId,
    BloodRequestResolution, BloodRequestStatus, BloodType, DonationRecord, DonationType,
    DonorHealthProfile, DonorId, HealthIntake, HospitalId, MedicalFlags, NewBloodRequest,
    RequestUrgency,
};
pub use eligibility::{
    can_accept_appointment, evaluate, CooldownPolicy, DisqualifyingReason, EligibilityError,
    EligibilityTracker, EligibilityVerdict, RejectionReason,
};
pub use roster::{screen_roster, DonorRosterImporter, RosterImportError, RosterScreening};
