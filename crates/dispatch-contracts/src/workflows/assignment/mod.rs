//! Assignment advisor: recommends whether an employee joins an open contract at a factory
//! line or gets a new one, and guards every assignment against the factory conflict date.

mod advisor;
pub mod conflict;
pub mod domain;
pub mod policy;
pub mod rates;
pub mod router;

#[cfg(test)]
mod tests;

pub use advisor::{AdvisorError, AssignmentAdvisor, AssignmentViolation, MissingEntity};
pub use conflict::{
    proposed_end_date, validate_conflict_date, ConflictDateInfo, ConflictPolicy,
    ConflictValidation, ConflictWarningLevel,
};
pub use domain::{
    AssignmentAction, AssignmentOutcome, AssignmentRequest, AssignmentSuggestion,
    ExistingContractSummary, SuggestionRequest,
};
pub use policy::AdvisorPolicy;
pub use rates::rate_difference_pct;
pub use router::assignment_router;
