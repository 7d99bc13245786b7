//! Seam for anchoring accepted donations on an external ledger.
//!
//! Only the contract lives here. Deployments plug in a client; the API service ships a
//! simulated ledger that hands back deterministic transaction references.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::appointments::AppointmentRecord;
use super::domain::{DonationType, DonorId, HospitalId};

/// Body written to the ledger for a verified donation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSubmission {
    pub donor_id: DonorId,
    pub hospital_id: HospitalId,
    pub donation_type: DonationType,
    pub status: String,
    pub timestamp: NaiveDate,
}

impl LedgerSubmission {
    pub fn for_accepted(record: &AppointmentRecord, verified_on: NaiveDate) -> Self {
        Self {
            donor_id: record.request.donor_id.clone(),
            hospital_id: record.request.hospital_id.clone(),
            donation_type: record.request.donation_type,
            status: "received".to_string(),
            timestamp: record.decided_on.unwrap_or(verified_on),
        }
    }

    /// UTF-8 JSON payload carried as transaction data.
    pub fn payload(&self) -> Result<Vec<u8>, LedgerError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Reference returned once the ledger accepted a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    pub tx_hash: String,
    pub network: String,
    pub recorded_on: NaiveDate,
}

pub trait DonationLedger: Send + Sync {
    fn record(
        &self,
        submission: &LedgerSubmission,
        recorded_on: NaiveDate,
    ) -> Result<LedgerReceipt, LedgerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger payload could not be encoded: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("ledger transport unavailable: {0}")]
    Transport(String),
}
