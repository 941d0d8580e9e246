use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Datelike, NaiveDate};

use super::domain::{
    Contract, ContractEmployee, ContractId, ContractNumber, ContractStatus, Employee, EmployeeId,
    Factory, FactoryId, LineId,
};
use super::draft::NewContract;
use super::repository::{DispatchRepository, RepositoryError, UpsertOutcome};

pub const DEFAULT_CONTRACT_PREFIX: &str = "KK";

/// Mutex-guarded ledger used by the service binary and tests.
#[derive(Clone)]
pub struct InMemoryDispatchStore {
    state: Arc<Mutex<StoreState>>,
    number_prefix: Arc<str>,
}

#[derive(Default)]
struct StoreState {
    employees: BTreeMap<EmployeeId, Employee>,
    factories: BTreeMap<FactoryId, Factory>,
    contracts: BTreeMap<ContractId, Contract>,
    last_contract_id: u64,
    monthly_sequence: BTreeMap<(i32, u32), u32>,
}

impl Default for InMemoryDispatchStore {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_CONTRACT_PREFIX)
    }
}

impl InMemoryDispatchStore {
    pub fn with_prefix(prefix: impl AsRef<str>) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            number_prefix: Arc::from(prefix.as_ref()),
        }
    }

    /// Load a contract exactly as recorded elsewhere (ids and numbers preserved).
    ///
    /// Id and per-month counters advance past the restored record so later inserts never collide.
    pub fn restore_contract(&self, contract: Contract) -> Result<(), RepositoryError> {
        let mut state = self.lock()?;
        if state.contracts.contains_key(&contract.id) {
            return Err(RepositoryError::Conflict(format!(
                "contract {} already exists",
                contract.id
            )));
        }
        check_roster(state.contracts.values(), &contract)?;

        state.last_contract_id = state.last_contract_id.max(contract.id.0);
        if let Some(sequence) = sequence_suffix(&contract.number) {
            let key = month_key(contract.start_date);
            let counter = state.monthly_sequence.entry(key).or_insert(0);
            *counter = (*counter).max(sequence);
        }
        state.contracts.insert(contract.id, contract);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }
}

impl DispatchRepository for InMemoryDispatchStore {
    fn employee(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        Ok(self.lock()?.employees.get(&id).cloned())
    }

    fn factory(&self, id: FactoryId) -> Result<Option<Factory>, RepositoryError> {
        Ok(self.lock()?.factories.get(&id).cloned())
    }

    fn contract(&self, id: ContractId) -> Result<Option<Contract>, RepositoryError> {
        Ok(self.lock()?.contracts.get(&id).cloned())
    }

    fn contracts(&self) -> Result<Vec<Contract>, RepositoryError> {
        Ok(self.lock()?.contracts.values().cloned().collect())
    }

    fn open_contracts_at_line(
        &self,
        factory_id: FactoryId,
        line_id: LineId,
        date: NaiveDate,
    ) -> Result<Vec<Contract>, RepositoryError> {
        let state = self.lock()?;
        Ok(state
            .contracts
            .values()
            .filter(|contract| contract.is_at(factory_id, line_id) && contract.is_open_on(date))
            .cloned()
            .collect())
    }

    fn insert_contract(&self, contract: NewContract) -> Result<Contract, RepositoryError> {
        let mut state = self.lock()?;

        let id = ContractId(state.last_contract_id + 1);
        let key = month_key(contract.start_date);
        let sequence = state.monthly_sequence.get(&key).copied().unwrap_or(0) + 1;

        let record = Contract {
            id,
            number: ContractNumber::allocate(&self.number_prefix, contract.start_date, sequence),
            factory_id: contract.factory_id,
            line_id: contract.line_id,
            site_name: contract.site_name,
            start_date: contract.start_date,
            end_date: contract.end_date,
            hourly_rate: contract.hourly_rate,
            overtime_rate: contract.overtime_rate,
            status: contract.status,
            employees: contract.employees,
            renewed_from: contract.renewed_from,
            revision: 0,
        };

        check_roster(state.contracts.values(), &record)?;

        state.last_contract_id = id.0;
        state.monthly_sequence.insert(key, sequence);
        state.contracts.insert(id, record.clone());
        Ok(record)
    }

    fn update_contract(&self, mut contract: Contract) -> Result<Contract, RepositoryError> {
        let mut state = self.lock()?;
        let stored = state
            .contracts
            .get(&contract.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.revision != contract.revision {
            return Err(RepositoryError::Conflict(format!(
                "contract {} changed since it was read (revision {} is now {})",
                contract.number, contract.revision, stored.revision
            )));
        }
        check_roster(state.contracts.values(), &contract)?;

        contract.revision += 1;
        state.contracts.insert(contract.id, contract.clone());
        Ok(contract)
    }

    fn append_assignment(
        &self,
        contract_id: ContractId,
        entry: ContractEmployee,
    ) -> Result<Contract, RepositoryError> {
        let mut state = self.lock()?;
        let mut contract = state
            .contracts
            .get(&contract_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;
        if contract.status != ContractStatus::Active {
            return Err(RepositoryError::Conflict(format!(
                "contract {} is {}, not active",
                contract.number, contract.status
            )));
        }

        contract.employees.push(entry);
        check_roster(state.contracts.values(), &contract)?;

        contract.revision += 1;
        state.contracts.insert(contract.id, contract.clone());
        Ok(contract)
    }

    fn upsert_employee(&self, employee: Employee) -> Result<UpsertOutcome, RepositoryError> {
        let mut state = self.lock()?;
        Ok(match state.employees.insert(employee.id, employee) {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Inserted,
        })
    }

    fn upsert_factory(&self, factory: Factory) -> Result<UpsertOutcome, RepositoryError> {
        let mut state = self.lock()?;
        Ok(match state.factories.insert(factory.id, factory) {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Inserted,
        })
    }
}

fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

fn sequence_suffix(number: &ContractNumber) -> Option<u32> {
    number.as_str().rsplit('-').next()?.parse().ok()
}

fn check_roster<'a>(
    existing: impl Iterator<Item = &'a Contract>,
    candidate: &Contract,
) -> Result<(), RepositoryError> {
    if let Some(entry) = candidate.misplaced_assignment() {
        return Err(RepositoryError::Invalid(format!(
            "employee {} on contract {} runs {} to {}, outside {} to {}",
            entry.employee_id,
            candidate.number,
            entry.start_date,
            entry.end_date,
            candidate.start_date,
            candidate.end_date
        )));
    }
    match double_booking(existing, candidate) {
        Some(reason) => Err(RepositoryError::Conflict(reason)),
        None => Ok(()),
    }
}

/// Describe the first overlapping active assignment `candidate` would create, if any.
fn double_booking<'a>(
    existing: impl Iterator<Item = &'a Contract>,
    candidate: &Contract,
) -> Option<String> {
    if candidate.status != ContractStatus::Active {
        return None;
    }

    for (index, entry) in candidate.employees.iter().enumerate() {
        let repeated = candidate.employees[index + 1..].iter().any(|other| {
            other.employee_id == entry.employee_id && other.overlaps(entry.start_date, entry.end_date)
        });
        if repeated {
            return Some(format!(
                "employee {} is listed twice on contract {} for overlapping dates",
                entry.employee_id, candidate.number
            ));
        }
    }

    let peers: Vec<&Contract> = existing
        .filter(|contract| {
            contract.id != candidate.id
                && contract.status == ContractStatus::Active
                && contract.is_at(candidate.factory_id, candidate.line_id)
        })
        .collect();

    for entry in &candidate.employees {
        for peer in &peers {
            let clash = peer.employees.iter().any(|other| {
                other.employee_id == entry.employee_id
                    && other.overlaps(entry.start_date, entry.end_date)
            });
            if clash {
                return Some(format!(
                    "employee {} already holds an active assignment on contract {} between {} and {}",
                    entry.employee_id, peer.number, entry.start_date, entry.end_date
                ));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn assignment(employee: u64, start: NaiveDate, end: NaiveDate) -> ContractEmployee {
        ContractEmployee {
            employee_id: EmployeeId(employee),
            hourly_rate: None,
            start_date: start,
            end_date: end,
            assigned_by: "test".to_string(),
        }
    }

    fn new_contract(start: NaiveDate, employees: Vec<ContractEmployee>) -> NewContract {
        NewContract {
            factory_id: FactoryId(1),
            line_id: LineId(1),
            site_name: "Site".to_string(),
            start_date: start,
            end_date: date(2025, 12, 31),
            hourly_rate: Some(1500),
            overtime_rate: Some(1875),
            status: ContractStatus::Active,
            employees,
            renewed_from: None,
        }
    }

    #[test]
    fn insert_allocates_sequential_numbers_per_month() {
        let store = InMemoryDispatchStore::default();
        let first = store
            .insert_contract(new_contract(date(2025, 1, 6), Vec::new()))
            .expect("insert");
        let second = store
            .insert_contract(new_contract(date(2025, 1, 20), Vec::new()))
            .expect("insert");
        let february = store
            .insert_contract(new_contract(date(2025, 2, 3), Vec::new()))
            .expect("insert");

        assert_eq!(first.id, ContractId(1));
        assert_eq!(first.number.as_str(), "KK-202501-001");
        assert_eq!(second.number.as_str(), "KK-202501-002");
        assert_eq!(february.id, ContractId(3));
        assert_eq!(february.number.as_str(), "KK-202502-001");
    }

    #[test]
    fn restore_advances_counters_past_existing_records() {
        let store = InMemoryDispatchStore::with_prefix("HK");
        let mut restored = store
            .insert_contract(new_contract(date(2025, 1, 6), Vec::new()))
            .expect("insert");
        let fresh = InMemoryDispatchStore::with_prefix("HK");
        restored.id = ContractId(42);
        restored.number = ContractNumber("HK-202501-015".to_string());
        fresh.restore_contract(restored).expect("restore");

        let next = fresh
            .insert_contract(new_contract(date(2025, 1, 9), Vec::new()))
            .expect("insert");
        assert_eq!(next.id, ContractId(43));
        assert_eq!(next.number.as_str(), "HK-202501-016");
    }

    #[test]
    fn insert_rejects_overlapping_assignment_on_same_line() {
        let store = InMemoryDispatchStore::default();
        store
            .insert_contract(new_contract(
                date(2025, 1, 1),
                vec![assignment(5, date(2025, 1, 1), date(2025, 6, 30))],
            ))
            .expect("first contract");

        let err = store
            .insert_contract(new_contract(
                date(2025, 3, 1),
                vec![assignment(5, date(2025, 3, 1), date(2025, 12, 31))],
            ))
            .expect_err("double booking rejected");
        assert!(matches!(err, RepositoryError::Conflict(_)));

        store
            .insert_contract(new_contract(
                date(2025, 7, 1),
                vec![assignment(5, date(2025, 7, 1), date(2025, 12, 31))],
            ))
            .expect("non-overlapping range accepted");
    }

    #[test]
    fn draft_contracts_skip_uniqueness_rule() {
        let store = InMemoryDispatchStore::default();
        store
            .insert_contract(new_contract(
                date(2025, 1, 1),
                vec![assignment(5, date(2025, 1, 1), date(2025, 6, 30))],
            ))
            .expect("active contract");
        let mut draft = new_contract(
            date(2025, 1, 1),
            vec![assignment(5, date(2025, 1, 1), date(2025, 6, 30))],
        );
        draft.status = ContractStatus::Draft;
        store.insert_contract(draft).expect("draft is not yet binding");
    }

    #[test]
    fn update_requires_existing_record() {
        let store = InMemoryDispatchStore::default();
        let mut contract = store
            .insert_contract(new_contract(date(2025, 1, 1), Vec::new()))
            .expect("insert");
        contract.id = ContractId(99);
        assert!(matches!(
            store.update_contract(contract),
            Err(RepositoryError::NotFound)
        ));
    }

    #[test]
    fn update_rejects_stale_copy() {
        let store = InMemoryDispatchStore::default();
        let stale = store
            .insert_contract(new_contract(date(2025, 1, 1), Vec::new()))
            .expect("insert");

        let appended = store
            .append_assignment(stale.id, assignment(5, date(2025, 2, 1), date(2025, 6, 30)))
            .expect("append");
        assert_eq!(appended.revision, 1);

        let mut overwrite = stale.clone();
        overwrite
            .employees
            .push(assignment(6, date(2025, 2, 1), date(2025, 6, 30)));
        assert!(matches!(
            store.update_contract(overwrite),
            Err(RepositoryError::Conflict(_))
        ));

        let stored = store
            .contract(stale.id)
            .expect("store readable")
            .expect("contract present");
        assert_eq!(stored.worker_count(), 1);
        assert!(stored.employee(EmployeeId(5)).is_some());
    }

    #[test]
    fn update_returns_bumped_revision() {
        let store = InMemoryDispatchStore::default();
        let mut contract = store
            .insert_contract(new_contract(date(2025, 1, 1), Vec::new()))
            .expect("insert");
        contract.site_name = "Renamed".to_string();

        let updated = store.update_contract(contract).expect("update");
        assert_eq!(updated.revision, 1);
        store.update_contract(updated).expect("fresh copy accepted");
    }

    #[test]
    fn appends_from_the_same_snapshot_both_persist() {
        let store = InMemoryDispatchStore::default();
        let contract = store
            .insert_contract(new_contract(date(2025, 1, 1), Vec::new()))
            .expect("insert");

        store
            .append_assignment(contract.id, assignment(5, date(2025, 2, 1), date(2025, 6, 30)))
            .expect("first append");
        store
            .append_assignment(contract.id, assignment(6, date(2025, 3, 1), date(2025, 6, 30)))
            .expect("second append");

        let stored = store
            .contract(contract.id)
            .expect("store readable")
            .expect("contract present");
        assert_eq!(stored.worker_count(), 2);
        assert_eq!(stored.revision, 2);
    }

    #[test]
    fn append_rejects_reversed_or_out_of_period_ranges() {
        let store = InMemoryDispatchStore::default();
        let contract = store
            .insert_contract(new_contract(date(2025, 6, 1), Vec::new()))
            .expect("insert");

        let reversed = store
            .append_assignment(contract.id, assignment(5, date(2025, 6, 1), date(2025, 2, 1)))
            .expect_err("reversed range rejected");
        assert!(matches!(reversed, RepositoryError::Invalid(_)));

        let early = store
            .append_assignment(contract.id, assignment(5, date(2025, 1, 1), date(2025, 7, 1)))
            .expect_err("range before contract start rejected");
        assert!(matches!(early, RepositoryError::Invalid(_)));

        let stored = store
            .contract(contract.id)
            .expect("store readable")
            .expect("contract present");
        assert_eq!(stored.worker_count(), 0);
        assert_eq!(stored.revision, 0);
    }

    #[test]
    fn append_rejects_double_booking_and_inactive_contracts() {
        let store = InMemoryDispatchStore::default();
        let first = store
            .insert_contract(new_contract(
                date(2025, 1, 1),
                vec![assignment(5, date(2025, 1, 1), date(2025, 6, 30))],
            ))
            .expect("first contract");
        let second = store
            .insert_contract(new_contract(date(2025, 3, 1), Vec::new()))
            .expect("second contract");

        let err = store
            .append_assignment(second.id, assignment(5, date(2025, 3, 1), date(2025, 12, 31)))
            .expect_err("double booking rejected");
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let mut expired = first;
        expired.status = ContractStatus::Expired;
        let expired = store.update_contract(expired).expect("expire");
        let err = store
            .append_assignment(expired.id, assignment(6, date(2025, 2, 1), date(2025, 3, 1)))
            .expect_err("inactive contract rejected");
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[test]
    fn open_contracts_filter_by_line_status_and_end() {
        let store = InMemoryDispatchStore::default();
        let open = store
            .insert_contract(new_contract(date(2025, 1, 1), Vec::new()))
            .expect("insert");
        let mut other_line = new_contract(date(2025, 1, 1), Vec::new());
        other_line.line_id = LineId(2);
        store.insert_contract(other_line).expect("insert");
        let mut draft = new_contract(date(2025, 1, 1), Vec::new());
        draft.status = ContractStatus::Draft;
        store.insert_contract(draft).expect("insert");

        let found = store
            .open_contracts_at_line(FactoryId(1), LineId(1), date(2025, 6, 1))
            .expect("query");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, open.id);

        let none = store
            .open_contracts_at_line(FactoryId(1), LineId(1), date(2026, 1, 1))
            .expect("query");
        assert!(none.is_empty());
    }
}
