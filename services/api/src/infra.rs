use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use pulse_connect::workflows::donation::appointments::{
    ActivityError, ActivityPublisher, HospitalActivity,
};
use pulse_connect::workflows::donation::ledger::{
    DonationLedger, LedgerError, LedgerReceipt, LedgerSubmission,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Hospital activity feed kept in process memory.
#[derive(Default, Clone)]
pub(crate) struct InMemoryActivityLog {
    events: Arc<Mutex<Vec<HospitalActivity>>>,
}

impl ActivityPublisher for InMemoryActivityLog {
    fn publish(&self, activity: HospitalActivity) -> Result<(), ActivityError> {
        let mut guard = self
            .events
            .lock()
            .map_err(|_| ActivityError::Transport("activity log poisoned".to_string()))?;
        guard.push(activity);
        Ok(())
    }
}

impl InMemoryActivityLog {
    pub(crate) fn events(&self) -> Vec<HospitalActivity> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

/// Stand-in ledger that hands out sequential transaction hashes.
pub(crate) struct SimulatedLedger {
    network: String,
    sequence: AtomicU64,
    submissions: Mutex<Vec<Vec<u8>>>,
}

impl Default for SimulatedLedger {
    fn default() -> Self {
        Self::new("polygon")
    }
}

impl SimulatedLedger {
    pub(crate) fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            sequence: AtomicU64::new(1),
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn submission_count(&self) -> usize {
        self.submissions
            .lock()
            .map(|guard| guard.len())
            .unwrap_or_default()
    }
}

impl DonationLedger for SimulatedLedger {
    fn record(
        &self,
        submission: &LedgerSubmission,
        recorded_on: NaiveDate,
    ) -> Result<LedgerReceipt, LedgerError> {
        let payload = submission.payload()?;
        self.submissions
            .lock()
            .map_err(|_| LedgerError::Transport("simulated ledger poisoned".to_string()))?
            .push(payload);

        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        Ok(LedgerReceipt {
            tx_hash: format!("0x{id:064x}"),
            network: self.network.clone(),
            recorded_on,
        })
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
