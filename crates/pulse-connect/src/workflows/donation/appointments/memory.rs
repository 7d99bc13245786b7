use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::super::domain::{
    AppointmentId, AppointmentStatus, BloodRequest, BloodRequestId, DonorHealthProfile, DonorId,
    HealthIntake, HospitalId,
};
use super::super::ledger::LedgerReceipt;
use super::repository::{
    AcceptanceCommit, AppointmentRecord, BloodRequestClosure, DonationRepository,
    RepositoryError, StatusTransition,
};

/// Records keyed by insertion slot so listings follow arrival order, not id spelling.
#[derive(Debug)]
struct Slotted<K, V> {
    next_slot: u64,
    slots: HashMap<K, u64>,
    records: BTreeMap<u64, V>,
}

impl<K, V> Default for Slotted<K, V> {
    fn default() -> Self {
        Self {
            next_slot: 0,
            slots: HashMap::new(),
            records: BTreeMap::new(),
        }
    }
}

impl<K: std::hash::Hash + Eq, V> Slotted<K, V> {
    fn contains(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    fn insert(&mut self, key: K, value: V) {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.slots.insert(key, slot);
        self.records.insert(slot, value);
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.slots.get(key).and_then(|slot| self.records.get(slot))
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let slot = self.slots.get(key)?;
        self.records.get_mut(slot)
    }

    fn oldest_first(&self) -> impl DoubleEndedIterator<Item = &V> {
        self.records.values()
    }
}

#[derive(Debug, Default)]
struct StoreState {
    donors: HashMap<DonorId, DonorHealthProfile>,
    appointments: Slotted<AppointmentId, AppointmentRecord>,
    blood_requests: Slotted<BloodRequestId, BloodRequest>,
}

/// Process-local store. One lock guards every table so acceptance commits both halves
/// together and linked appointments see a consistent blood request.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDonationStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryDonationStore {
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl DonationRepository for InMemoryDonationStore {
    fn insert_donor(
        &self,
        profile: DonorHealthProfile,
    ) -> Result<DonorHealthProfile, RepositoryError> {
        let mut state = self.lock()?;
        if state.donors.contains_key(&profile.donor_id) {
            return Err(RepositoryError::Conflict);
        }
        state
            .donors
            .insert(profile.donor_id.clone(), profile.clone());
        Ok(profile)
    }

    fn update_health(
        &self,
        donor_id: &DonorId,
        intake: HealthIntake,
    ) -> Result<DonorHealthProfile, RepositoryError> {
        let mut state = self.lock()?;
        let profile = state
            .donors
            .get_mut(donor_id)
            .ok_or(RepositoryError::NotFound)?;
        profile.apply_intake(intake);
        Ok(profile.clone())
    }

    fn fetch_donor(&self, id: &DonorId) -> Result<Option<DonorHealthProfile>, RepositoryError> {
        let state = self.lock()?;
        Ok(state.donors.get(id).cloned())
    }

    fn insert_appointment(
        &self,
        record: AppointmentRecord,
    ) -> Result<AppointmentRecord, RepositoryError> {
        let mut state = self.lock()?;
        if state.appointments.contains(&record.appointment_id) {
            return Err(RepositoryError::Conflict);
        }
        if let Some(request_id) = &record.request.request_id {
            let linked = state
                .blood_requests
                .get(request_id)
                .ok_or(RepositoryError::NotFound)?;
            if !linked.is_open() {
                return Err(RepositoryError::RequestNotOpen(linked.status));
            }
        }
        state
            .appointments
            .insert(record.appointment_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch_appointment(
        &self,
        id: &AppointmentId,
    ) -> Result<Option<AppointmentRecord>, RepositoryError> {
        let state = self.lock()?;
        Ok(state.appointments.get(id).cloned())
    }

    fn transition(
        &self,
        transition: StatusTransition,
    ) -> Result<AppointmentRecord, RepositoryError> {
        let mut state = self.lock()?;
        let record = state
            .appointments
            .get_mut(&transition.appointment_id)
            .ok_or(RepositoryError::NotFound)?;

        if record.status != transition.expected {
            return Err(RepositoryError::StaleState {
                expected: transition.expected,
                found: record.status,
            });
        }

        record.status = transition.next;
        record.decided_on = Some(transition.decided_on);
        record.note = transition.note;
        Ok(record.clone())
    }

    fn commit_acceptance(
        &self,
        commit: AcceptanceCommit,
    ) -> Result<(AppointmentRecord, DonorHealthProfile), RepositoryError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;

        let record = state
            .appointments
            .get_mut(&commit.appointment_id)
            .ok_or(RepositoryError::NotFound)?;
        if record.status != AppointmentStatus::Pending {
            return Err(RepositoryError::StaleState {
                expected: AppointmentStatus::Pending,
                found: record.status,
            });
        }

        let donor = state
            .donors
            .get_mut(&commit.donor_id)
            .ok_or(RepositoryError::NotFound)?;
        if donor.last_donation != commit.expected_last_donation {
            return Err(RepositoryError::StaleSnapshot);
        }

        record.status = AppointmentStatus::Accepted;
        record.decided_on = Some(commit.accepted_on);
        donor.last_donation = Some(commit.donation);

        Ok((record.clone(), donor.clone()))
    }

    fn attach_ledger_receipt(
        &self,
        id: &AppointmentId,
        receipt: LedgerReceipt,
    ) -> Result<AppointmentRecord, RepositoryError> {
        let mut state = self.lock()?;
        let record = state
            .appointments
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        if record.ledger_receipt.is_some() {
            return Err(RepositoryError::Conflict);
        }
        record.ledger_receipt = Some(receipt);
        Ok(record.clone())
    }

    fn hospital_appointments(
        &self,
        hospital_id: &HospitalId,
    ) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .appointments
            .oldest_first()
            .rev()
            .filter(|record| &record.request.hospital_id == hospital_id)
            .cloned()
            .collect())
    }

    fn pending(&self, limit: usize) -> Result<Vec<AppointmentRecord>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .appointments
            .oldest_first()
            .filter(|record| record.status == AppointmentStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }

    fn insert_blood_request(&self, request: BloodRequest) -> Result<BloodRequest, RepositoryError> {
        let mut state = self.lock()?;
        if state.blood_requests.contains(&request.request_id) {
            return Err(RepositoryError::Conflict);
        }
        state
            .blood_requests
            .insert(request.request_id.clone(), request.clone());
        Ok(request)
    }

    fn fetch_blood_request(
        &self,
        id: &BloodRequestId,
    ) -> Result<Option<BloodRequest>, RepositoryError> {
        let state = self.lock()?;
        Ok(state.blood_requests.get(id).cloned())
    }

    fn close_blood_request(
        &self,
        closure: BloodRequestClosure,
    ) -> Result<BloodRequest, RepositoryError> {
        let mut state = self.lock()?;
        let request = state
            .blood_requests
            .get_mut(&closure.request_id)
            .ok_or(RepositoryError::NotFound)?;
        if !request.is_open() {
            return Err(RepositoryError::RequestNotOpen(request.status));
        }

        request.status = closure.status;
        request.closed_on = Some(closure.closed_on);
        Ok(request.clone())
    }

    fn hospital_blood_requests(
        &self,
        hospital_id: &HospitalId,
    ) -> Result<Vec<BloodRequest>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .blood_requests
            .oldest_first()
            .rev()
            .filter(|request| &request.hospital_id == hospital_id)
            .cloned()
            .collect())
    }

    fn open_blood_requests(&self) -> Result<Vec<BloodRequest>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .blood_requests
            .oldest_first()
            .rev()
            .filter(|request| request.is_open())
            .cloned()
            .collect())
    }
}
