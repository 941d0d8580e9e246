use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::domain::{
    Contract, ContractEmployee, ContractId, ContractStatus, FactoryId, LineId,
    StatusTransitionError,
};
use super::draft::{ContractDraftBuilder, DraftError, NewContract};
use super::repository::{DispatchRepository, RepositoryError};
use crate::workflows::assignment::conflict::validate_conflict_date;

/// Contract ledger operations: drafting, status transitions, renewal and expiry.
pub struct ContractService<R> {
    repository: Arc<R>,
}

impl<R> ContractService<R>
where
    R: DispatchRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn create_draft(&self, draft: NewContract) -> Result<Contract, ContractError> {
        let factory = self
            .repository
            .factory(draft.factory_id)?
            .ok_or(ContractError::UnknownSite {
                factory_id: draft.factory_id,
                line_id: draft.line_id,
            })?;
        if factory.line(draft.line_id).is_none() {
            return Err(ContractError::UnknownSite {
                factory_id: draft.factory_id,
                line_id: draft.line_id,
            });
        }
        if draft.status == ContractStatus::Active {
            ensure_within_conflict_date(factory.conflict_date, draft.end_date)?;
        }

        let contract = self.repository.insert_contract(draft)?;
        info!(contract = %contract.number, status = %contract.status, "contract created");
        Ok(contract)
    }

    pub fn get(&self, id: ContractId) -> Result<Contract, ContractError> {
        self.repository
            .contract(id)?
            .ok_or(ContractError::NotFound(id))
    }

    pub fn list(&self) -> Result<Vec<Contract>, ContractError> {
        Ok(self.repository.contracts()?)
    }

    /// Apply a status change; activation re-checks the factory conflict date.
    pub fn transition(
        &self,
        id: ContractId,
        next: ContractStatus,
    ) -> Result<Contract, ContractError> {
        let mut contract = self.get(id)?;
        if next == ContractStatus::Active {
            let conflict_date = self
                .repository
                .factory(contract.factory_id)?
                .and_then(|factory| factory.conflict_date);
            ensure_within_conflict_date(conflict_date, contract.end_date)?;
        }

        let previous = contract.status;
        contract.transition(next)?;
        let contract = self.repository.update_contract(contract)?;
        info!(contract = %contract.number, from = %previous, to = %next, "contract status changed");
        Ok(contract)
    }

    /// Close an active contract as renewed and open its successor through `new_end_date`.
    ///
    /// Workers still on the roster at the old end date carry over with their rate overrides.
    pub fn renew(&self, id: ContractId, new_end_date: NaiveDate) -> Result<Contract, ContractError> {
        let mut current = self.get(id)?;
        if current.status != ContractStatus::Active {
            return Err(StatusTransitionError {
                from: current.status,
                to: ContractStatus::Renewed,
            }
            .into());
        }

        let successor_start = current
            .end_date
            .succ_opt()
            .filter(|start| *start <= new_end_date)
            .ok_or(ContractError::RenewalPeriod {
                current_end: current.end_date,
                requested_end: new_end_date,
            })?;

        let conflict_date = self
            .repository
            .factory(current.factory_id)?
            .and_then(|factory| factory.conflict_date);
        ensure_within_conflict_date(conflict_date, new_end_date)?;

        let mut builder = ContractDraftBuilder::new()
            .factory(current.factory_id)
            .line(current.line_id)
            .site_name(current.site_name.clone())
            .period(successor_start, new_end_date)
            .hourly_rate(current.hourly_rate)
            .overtime_rate(current.overtime_rate)
            .status(ContractStatus::Active)
            .renewed_from(current.id);
        for entry in current
            .employees
            .iter()
            .filter(|entry| entry.end_date == current.end_date)
        {
            builder = builder.employee(ContractEmployee {
                employee_id: entry.employee_id,
                hourly_rate: entry.hourly_rate,
                start_date: successor_start,
                end_date: new_end_date,
                assigned_by: entry.assigned_by.clone(),
            });
        }
        let successor = builder.build()?;

        let previous = current.clone();
        current.transition(ContractStatus::Renewed)?;
        let renewed = self.repository.update_contract(current)?;

        match self.repository.insert_contract(successor) {
            Ok(contract) => {
                info!(
                    previous = %previous.number,
                    successor = %contract.number,
                    end = %contract.end_date,
                    "contract renewed"
                );
                Ok(contract)
            }
            Err(err) => {
                warn!(contract = %previous.number, error = %err, "renewal rolled back");
                self.repository.update_contract(Contract {
                    revision: renewed.revision,
                    ..previous
                })?;
                Err(err.into())
            }
        }
    }

    /// Expire every active contract that ended before `today`.
    pub fn expire_due(&self, today: NaiveDate) -> Result<Vec<ContractId>, ContractError> {
        let mut expired = Vec::new();
        for mut contract in self.repository.contracts()? {
            if contract.status == ContractStatus::Active && contract.end_date < today {
                contract.transition(ContractStatus::Expired)?;
                expired.push(contract.id);
                self.repository.update_contract(contract)?;
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), %today, "expired finished contracts");
        }
        Ok(expired)
    }
}

fn ensure_within_conflict_date(
    conflict_date: Option<NaiveDate>,
    end_date: NaiveDate,
) -> Result<(), ContractError> {
    let validation = validate_conflict_date(conflict_date, end_date);
    match (validation.valid, validation.conflict_date) {
        (false, Some(conflict_date)) => Err(ContractError::ConflictDateExceeded {
            end_date,
            conflict_date,
        }),
        _ => Ok(()),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("contract {0} not found")]
    NotFound(ContractId),
    #[error("factory {factory_id} has no line {line_id}")]
    UnknownSite {
        factory_id: FactoryId,
        line_id: LineId,
    },
    #[error(transparent)]
    Transition(#[from] StatusTransitionError),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error("renewal must end after the current end date {current_end} (requested {requested_end})")]
    RenewalPeriod {
        current_end: NaiveDate,
        requested_end: NaiveDate,
    },
    #[error("contract end {end_date} exceeds the factory conflict date {conflict_date}")]
    ConflictDateExceeded {
        end_date: NaiveDate,
        conflict_date: NaiveDate,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
