//! Contract ledger: master data, contract numbering, status lifecycle and the
//! uniqueness rule for active assignments.

pub mod domain;
pub mod draft;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;

pub use domain::{
    overtime_rate_for, Contract, ContractEmployee, ContractId, ContractNumber, ContractStatus,
    Employee, EmployeeId, Factory, FactoryId, FactoryLine, LineId, StatusTransitionError,
};
pub use draft::{ContractDraftBuilder, DraftError, NewContract};
pub use repository::{DispatchRepository, RepositoryError, UpsertOutcome};
pub use router::contract_router;
pub use service::{ContractError, ContractService};
pub use store::{InMemoryDispatchStore, DEFAULT_CONTRACT_PREFIX};
