use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::conflict::{
    proposed_end_date, validate_conflict_date, ConflictValidation, ConflictWarningLevel,
};
use super::domain::{
    AssignmentAction, AssignmentOutcome, AssignmentRequest, AssignmentSuggestion,
    ExistingContractSummary, SuggestionRequest,
};
use super::policy::AdvisorPolicy;
use super::rates::rate_difference_pct;
use crate::session::SessionContext;
use crate::workflows::contracts::domain::{
    Contract, ContractEmployee, ContractId, ContractStatus, Employee, EmployeeId, Factory,
    FactoryId, FactoryLine, LineId,
};
use crate::workflows::contracts::draft::{ContractDraftBuilder, DraftError};
use crate::workflows::contracts::repository::{DispatchRepository, RepositoryError};

/// Decides between joining an open contract and opening a new one, and executes the choice.
pub struct AssignmentAdvisor<R> {
    repository: Arc<R>,
    policy: AdvisorPolicy,
}

struct Placement {
    employee: Employee,
    factory: Factory,
    line: FactoryLine,
}

impl<R> AssignmentAdvisor<R>
where
    R: DispatchRepository + 'static,
{
    pub fn new(repository: Arc<R>, policy: AdvisorPolicy) -> Self {
        Self { repository, policy }
    }

    /// Recommend `add_to_existing` or `create_new`. Read-only and repeatable.
    pub fn suggest(
        &self,
        request: &SuggestionRequest,
    ) -> Result<AssignmentSuggestion, AdvisorError> {
        let placement = self.placement(
            request.employee_id,
            request.factory_id,
            request.factory_line_id,
        )?;
        let months = self.duration(request.duration_months)?;
        let proposed_end = end_after(request.start_date, months)?;
        let employee_rate = placement.employee.billing_rate;

        let existing = self.open_contract(
            request.factory_id,
            request.factory_line_id,
            request.start_date,
        )?;

        let conflict_date_info = placement
            .factory
            .conflict_date
            .map(|conflict_date| self.policy.conflict.classify(conflict_date, proposed_end));

        let suggestion = match existing {
            Some(contract) => {
                let difference = rate_difference_pct(contract.hourly_rate, employee_rate);
                AssignmentSuggestion {
                    recommendation: AssignmentAction::AddToExisting,
                    reason: format!(
                        "active contract {} at {} runs until {} with {} worker(s); add the employee to it",
                        contract.number,
                        contract.site_name,
                        contract.end_date,
                        contract.worker_count()
                    ),
                    employee_rate,
                    existing_contract: Some(ExistingContractSummary::from(&contract)),
                    rate_difference_pct: difference,
                    rate_warning: self.policy.rate_mismatch(difference),
                    proposed_end_date: proposed_end,
                    conflict_date_info,
                }
            }
            None => AssignmentSuggestion {
                recommendation: AssignmentAction::CreateNew,
                reason: format!(
                    "no active contract at {} runs on or after {}; create a new contract",
                    placement.factory.site_name(&placement.line),
                    request.start_date
                ),
                employee_rate,
                existing_contract: None,
                rate_difference_pct: None,
                rate_warning: false,
                proposed_end_date: proposed_end,
                conflict_date_info,
            },
        };

        debug!(
            employee = %request.employee_id,
            factory = %request.factory_id,
            line = %request.factory_line_id,
            recommendation = suggestion.recommendation.label(),
            "assignment suggestion computed"
        );
        Ok(suggestion)
    }

    /// Perform the confirmed action. Advisory findings come back as warnings; crossing the
    /// conflict date is the only policy check that fails the request.
    pub fn assign(
        &self,
        request: &AssignmentRequest,
        session: &SessionContext,
    ) -> Result<AssignmentOutcome, AdvisorError> {
        let placement = self.placement(
            request.employee_id,
            request.factory_id,
            request.factory_line_id,
        )?;

        let outcome = match request.action {
            AssignmentAction::AddToExisting => self.add_to_existing(request, &placement, session),
            AssignmentAction::CreateNew => self.create_new(request, &placement, session),
        };

        match &outcome {
            Ok(outcome) => info!(
                employee = %request.employee_id,
                contract = %outcome.contract_number,
                action = outcome.action_taken.label(),
                operator = %session.operator,
                request_id = session.request_id,
                warnings = outcome.warnings.len(),
                "employee assigned"
            ),
            Err(err) => warn!(
                employee = %request.employee_id,
                action = request.action.label(),
                operator = %session.operator,
                request_id = session.request_id,
                error = %err,
                "assignment rejected"
            ),
        }
        outcome
    }

    pub fn validate_conflict_date(
        &self,
        factory_id: FactoryId,
        proposed_end_date: NaiveDate,
    ) -> Result<ConflictValidation, AdvisorError> {
        let factory = self
            .repository
            .factory(factory_id)?
            .ok_or(AdvisorError::NotFound(MissingEntity::Factory(factory_id)))?;
        Ok(validate_conflict_date(factory.conflict_date, proposed_end_date))
    }

    fn add_to_existing(
        &self,
        request: &AssignmentRequest,
        placement: &Placement,
        session: &SessionContext,
    ) -> Result<AssignmentOutcome, AdvisorError> {
        let contract = match request.existing_contract_id {
            Some(id) => self
                .repository
                .contract(id)?
                .ok_or(AdvisorError::NotFound(MissingEntity::Contract(id)))?,
            None => self
                .open_contract(request.factory_id, request.factory_line_id, request.start_date)?
                .ok_or(AssignmentViolation::NoOpenContract {
                    line_id: request.factory_line_id,
                    start_date: request.start_date,
                })?,
        };

        if contract.status != ContractStatus::Active {
            return Err(AssignmentViolation::ContractNotActive {
                contract: contract.number.to_string(),
                status: contract.status,
            }
            .into());
        }
        if !contract.is_at(request.factory_id, request.factory_line_id) {
            return Err(AssignmentViolation::ContractAtOtherSite {
                contract: contract.number.to_string(),
            }
            .into());
        }
        if contract.end_date < request.start_date {
            return Err(AssignmentViolation::ContractEnded {
                contract: contract.number.to_string(),
                end_date: contract.end_date,
            }
            .into());
        }

        let mut warnings = Vec::new();

        let assignment_start = request.start_date.max(contract.start_date);
        if assignment_start != request.start_date {
            warnings.push(format!(
                "contract {} starts on {}; the assignment begins then",
                contract.number, contract.start_date
            ));
        }

        let assignment_end = match request.duration_months {
            Some(months) => {
                let requested_end = end_after(assignment_start, self.duration(Some(months))?)?;
                if requested_end > contract.end_date {
                    warnings.push(format!(
                        "requested end {} is capped to the contract end {}",
                        requested_end, contract.end_date
                    ));
                    contract.end_date
                } else {
                    requested_end
                }
            }
            None => contract.end_date,
        };

        self.enforce_conflict_date(&placement.factory, assignment_end, &mut warnings)?;

        let override_rate = request
            .hourly_rate
            .filter(|rate| Some(*rate) != contract.hourly_rate);
        if let Some(rate) = override_rate {
            warnings.push(match contract.hourly_rate {
                Some(contract_rate) => format!(
                    "hourly rate override ¥{rate} differs from the contract rate ¥{contract_rate}"
                ),
                None => format!("hourly rate override ¥{rate} applied; contract has no rate"),
            });
        }

        let effective_rate = override_rate.or(contract.hourly_rate);
        self.check_rate_gap(effective_rate, &placement.employee, &mut warnings);

        let contract = self.repository.append_assignment(
            contract.id,
            ContractEmployee {
                employee_id: placement.employee.id,
                hourly_rate: override_rate,
                start_date: assignment_start,
                end_date: assignment_end,
                assigned_by: session.operator.clone(),
            },
        )?;

        Ok(AssignmentOutcome {
            action_taken: AssignmentAction::AddToExisting,
            contract_id: contract.id,
            contract_number: contract.number,
            assignment_start,
            assignment_end,
            warnings,
        })
    }

    fn create_new(
        &self,
        request: &AssignmentRequest,
        placement: &Placement,
        session: &SessionContext,
    ) -> Result<AssignmentOutcome, AdvisorError> {
        let months = self.duration(request.duration_months)?;
        let end_date = end_after(request.start_date, months)?;

        let mut warnings = Vec::new();
        self.enforce_conflict_date(&placement.factory, end_date, &mut warnings)?;

        let hourly_rate = request
            .hourly_rate
            .or(placement.line.default_hourly_rate)
            .or(placement.employee.billing_rate);
        match hourly_rate {
            Some(rate) => self.check_rate_gap(Some(rate), &placement.employee, &mut warnings),
            None => warnings.push(
                "no hourly rate on file for the line or employee; contract created without a rate"
                    .to_string(),
            ),
        }

        let draft = ContractDraftBuilder::new()
            .hourly_rate(hourly_rate)
            .site(&placement.factory, &placement.line)
            .period(request.start_date, end_date)
            .status(ContractStatus::Active)
            .employee(ContractEmployee {
                employee_id: placement.employee.id,
                hourly_rate: None,
                start_date: request.start_date,
                end_date,
                assigned_by: session.operator.clone(),
            })
            .build()
            .map_err(AssignmentViolation::from)?;

        let contract = self.repository.insert_contract(draft)?;

        Ok(AssignmentOutcome {
            action_taken: AssignmentAction::CreateNew,
            contract_id: contract.id,
            contract_number: contract.number,
            assignment_start: request.start_date,
            assignment_end: end_date,
            warnings,
        })
    }

    fn placement(
        &self,
        employee_id: EmployeeId,
        factory_id: FactoryId,
        line_id: LineId,
    ) -> Result<Placement, AdvisorError> {
        let employee = self
            .repository
            .employee(employee_id)?
            .ok_or(AdvisorError::NotFound(MissingEntity::Employee(employee_id)))?;
        let factory = self
            .repository
            .factory(factory_id)?
            .ok_or(AdvisorError::NotFound(MissingEntity::Factory(factory_id)))?;
        let line = factory
            .line(line_id)
            .cloned()
            .ok_or(AdvisorError::NotFound(MissingEntity::Line {
                factory_id,
                line_id,
            }))?;

        Ok(Placement {
            employee,
            factory,
            line,
        })
    }

    /// Latest-ending open contract at the line; ties go to the lowest id.
    fn open_contract(
        &self,
        factory_id: FactoryId,
        line_id: LineId,
        start_date: NaiveDate,
    ) -> Result<Option<Contract>, AdvisorError> {
        let candidates = self
            .repository
            .open_contracts_at_line(factory_id, line_id, start_date)?;
        Ok(candidates
            .into_iter()
            .filter(|contract| contract.is_at(factory_id, line_id) && contract.is_open_on(start_date))
            .max_by_key(|contract| (contract.end_date, Reverse(contract.id))))
    }

    fn duration(&self, requested: Option<u32>) -> Result<u32, AdvisorError> {
        match requested {
            Some(0) => Err(AssignmentViolation::InvalidDuration(0).into()),
            Some(months) => Ok(months),
            None => Ok(self.policy.default_duration_months),
        }
    }

    fn enforce_conflict_date(
        &self,
        factory: &Factory,
        end_date: NaiveDate,
        warnings: &mut Vec<String>,
    ) -> Result<(), AdvisorError> {
        let Some(conflict_date) = factory.conflict_date else {
            return Ok(());
        };

        let info = self.policy.conflict.classify(conflict_date, end_date);
        match info.warning_level {
            ConflictWarningLevel::Expired => Err(AssignmentViolation::ConflictDateExceeded {
                end_date,
                conflict_date,
            }
            .into()),
            ConflictWarningLevel::Warning | ConflictWarningLevel::Danger => {
                warnings.push(info.message);
                Ok(())
            }
            ConflictWarningLevel::Ok => Ok(()),
        }
    }

    fn check_rate_gap(&self, rate: Option<u32>, employee: &Employee, warnings: &mut Vec<String>) {
        let difference = rate_difference_pct(rate, employee.billing_rate);
        if self.policy.rate_mismatch(difference) {
            if let (Some(rate), Some(own), Some(pct)) = (rate, employee.billing_rate, difference) {
                warnings.push(format!(
                    "contract rate ¥{rate} differs from {}'s billing rate ¥{own} by {pct}%",
                    employee.full_name
                ));
            }
        }
    }
}

fn end_after(start_date: NaiveDate, months: u32) -> Result<NaiveDate, AdvisorError> {
    proposed_end_date(start_date, months)
        .ok_or(AssignmentViolation::InvalidDuration(months).into())
}

/// Entity a lookup failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingEntity {
    Employee(EmployeeId),
    Factory(FactoryId),
    Line { factory_id: FactoryId, line_id: LineId },
    Contract(ContractId),
}

impl fmt::Display for MissingEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingEntity::Employee(id) => write!(f, "employee {id}"),
            MissingEntity::Factory(id) => write!(f, "factory {id}"),
            MissingEntity::Line {
                factory_id,
                line_id,
            } => write!(f, "line {line_id} at factory {factory_id}"),
            MissingEntity::Contract(id) => write!(f, "contract {id}"),
        }
    }
}

/// Validation failures that reject an assignment outright.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentViolation {
    #[error("assignment end {end_date} exceeds the factory conflict date {conflict_date}")]
    ConflictDateExceeded {
        end_date: NaiveDate,
        conflict_date: NaiveDate,
    },
    #[error("contract {contract} is {status}, not active")]
    ContractNotActive {
        contract: String,
        status: ContractStatus,
    },
    #[error("contract {contract} belongs to a different factory line")]
    ContractAtOtherSite { contract: String },
    #[error("contract {contract} ended on {end_date}, before the requested start")]
    ContractEnded {
        contract: String,
        end_date: NaiveDate,
    },
    #[error("no active contract at line {line_id} runs on or after {start_date}")]
    NoOpenContract {
        line_id: LineId,
        start_date: NaiveDate,
    },
    #[error("duration of {0} month(s) is not a valid assignment length")]
    InvalidDuration(u32),
    #[error(transparent)]
    Draft(#[from] DraftError),
}

#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error("{0} not found")]
    NotFound(MissingEntity),
    #[error(transparent)]
    Validation(#[from] AssignmentViolation),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
