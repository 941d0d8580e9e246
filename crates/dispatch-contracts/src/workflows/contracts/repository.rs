use chrono::NaiveDate;

use super::domain::{
    Contract, ContractEmployee, ContractId, Employee, EmployeeId, Factory, FactoryId, LineId,
};
use super::draft::NewContract;

/// Storage abstraction for master data and the contract ledger.
///
/// Implementations serialize writes; the uniqueness rule (no employee holds two
/// overlapping active assignments on the same line) is enforced here, not by callers.
pub trait DispatchRepository: Send + Sync {
    fn employee(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError>;
    fn factory(&self, id: FactoryId) -> Result<Option<Factory>, RepositoryError>;
    fn contract(&self, id: ContractId) -> Result<Option<Contract>, RepositoryError>;
    fn contracts(&self) -> Result<Vec<Contract>, RepositoryError>;
    /// Active contracts at the line whose end date is on or after `date`.
    fn open_contracts_at_line(
        &self,
        factory_id: FactoryId,
        line_id: LineId,
        date: NaiveDate,
    ) -> Result<Vec<Contract>, RepositoryError>;
    /// Persist a new contract, allocating its id and monthly sequence number.
    fn insert_contract(&self, contract: NewContract) -> Result<Contract, RepositoryError>;
    /// Replace a stored contract. The write is rejected when `contract.revision` no longer
    /// matches the stored record; the returned copy carries the new revision.
    fn update_contract(&self, contract: Contract) -> Result<Contract, RepositoryError>;
    /// Add one roster entry to an active contract in a single step.
    fn append_assignment(
        &self,
        contract_id: ContractId,
        entry: ContractEmployee,
    ) -> Result<Contract, RepositoryError>;
    fn upsert_employee(&self, employee: Employee) -> Result<UpsertOutcome, RepositoryError>;
    fn upsert_factory(&self, factory: Factory) -> Result<UpsertOutcome, RepositoryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("integrity conflict: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("invalid record: {0}")]
    Invalid(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
