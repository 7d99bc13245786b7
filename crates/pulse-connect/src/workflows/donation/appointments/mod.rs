//! Appointment lifecycle: donor requests, hospital decisions, and ledger verification.

pub mod clock;
mod memory;
pub mod repository;
pub mod router;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use memory::InMemoryDonationStore;
pub use repository::{
    AcceptanceCommit, ActivityError, ActivityPublisher, AppointmentRecord, AppointmentStatusView,
    BloodRequestClosure, DonationRepository, HospitalActivity, RepositoryError, StatusTransition,
};
pub use router::{donation_router, donation_router_with_clock};
pub use service::{AcceptanceOutcome, AppointmentService, AppointmentServiceError};
