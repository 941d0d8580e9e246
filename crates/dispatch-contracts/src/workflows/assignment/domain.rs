use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::conflict::ConflictDateInfo;
use crate::workflows::contracts::domain::{
    Contract, ContractId, ContractNumber, EmployeeId, FactoryId, LineId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentAction {
    AddToExisting,
    CreateNew,
}

impl AssignmentAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::AddToExisting => "add_to_existing",
            Self::CreateNew => "create_new",
        }
    }
}

/// Read-only advisor query. `duration_months` falls back to the policy default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub employee_id: EmployeeId,
    pub factory_id: FactoryId,
    pub factory_line_id: LineId,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub duration_months: Option<u32>,
}

/// Execution request carrying the caller's confirmed decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRequest {
    pub employee_id: EmployeeId,
    pub factory_id: FactoryId,
    pub factory_line_id: LineId,
    pub start_date: NaiveDate,
    pub action: AssignmentAction,
    #[serde(default)]
    pub existing_contract_id: Option<ContractId>,
    #[serde(default)]
    pub duration_months: Option<u32>,
    /// Overrides the contract or line rate for this employee.
    #[serde(default)]
    pub hourly_rate: Option<u32>,
}

impl AssignmentRequest {
    pub fn suggestion(&self) -> SuggestionRequest {
        SuggestionRequest {
            employee_id: self.employee_id,
            factory_id: self.factory_id,
            factory_line_id: self.factory_line_id,
            start_date: self.start_date,
            duration_months: self.duration_months,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingContractSummary {
    pub id: ContractId,
    pub number: ContractNumber,
    pub site_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub current_workers: usize,
    pub hourly_rate: Option<u32>,
}

impl From<&Contract> for ExistingContractSummary {
    fn from(contract: &Contract) -> Self {
        Self {
            id: contract.id,
            number: contract.number.clone(),
            site_name: contract.site_name.clone(),
            start_date: contract.start_date,
            end_date: contract.end_date,
            current_workers: contract.worker_count(),
            hourly_rate: contract.hourly_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSuggestion {
    pub recommendation: AssignmentAction,
    pub reason: String,
    pub employee_rate: Option<u32>,
    pub existing_contract: Option<ExistingContractSummary>,
    pub rate_difference_pct: Option<u32>,
    pub rate_warning: bool,
    pub proposed_end_date: NaiveDate,
    pub conflict_date_info: Option<ConflictDateInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentOutcome {
    pub action_taken: AssignmentAction,
    pub contract_id: ContractId,
    pub contract_number: ContractNumber,
    pub assignment_start: NaiveDate,
    pub assignment_end: NaiveDate,
    pub warnings: Vec<String>,
}
