use chrono::NaiveDate;

use super::domain::{
    overtime_rate_for, ContractEmployee, ContractId, ContractStatus, Factory, FactoryId,
    FactoryLine, LineId,
};

/// Fully validated contract payload ready for the store to number and persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContract {
    pub factory_id: FactoryId,
    pub line_id: LineId,
    pub site_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub hourly_rate: Option<u32>,
    pub overtime_rate: Option<u32>,
    pub status: ContractStatus,
    pub employees: Vec<ContractEmployee>,
    pub renewed_from: Option<ContractId>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("contract draft is missing {0}")]
    MissingField(&'static str),
    #[error("contract end date {end} precedes start date {start}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },
    #[error("hourly rate must be greater than zero")]
    ZeroRate,
    #[error("new contracts start as draft or active, not {0}")]
    InvalidInitialStatus(ContractStatus),
    #[error("employee {employee} assignment falls outside the contract period")]
    AssignmentOutsidePeriod { employee: u64 },
}

/// By-value builder; every setter consumes and returns the builder so partially
/// filled drafts are never shared or mutated behind a caller's back.
#[derive(Debug, Clone, Default)]
pub struct ContractDraftBuilder {
    factory_id: Option<FactoryId>,
    line_id: Option<LineId>,
    site_name: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    hourly_rate: Option<u32>,
    overtime_rate: Option<u32>,
    status: ContractStatus,
    employees: Vec<ContractEmployee>,
    renewed_from: Option<ContractId>,
}

impl ContractDraftBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed factory, line, site name and the line's default rate.
    pub fn site(mut self, factory: &Factory, line: &FactoryLine) -> Self {
        self.factory_id = Some(factory.id);
        self.line_id = Some(line.id);
        self.site_name = Some(factory.site_name(line));
        if self.hourly_rate.is_none() {
            self.hourly_rate = line.default_hourly_rate;
        }
        self
    }

    pub fn factory(mut self, factory_id: FactoryId) -> Self {
        self.factory_id = Some(factory_id);
        self
    }

    pub fn line(mut self, line_id: LineId) -> Self {
        self.line_id = Some(line_id);
        self
    }

    pub fn site_name(mut self, site_name: impl Into<String>) -> Self {
        self.site_name = Some(site_name.into());
        self
    }

    pub fn period(mut self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self.end_date = Some(end_date);
        self
    }

    pub fn hourly_rate(mut self, hourly_rate: Option<u32>) -> Self {
        if hourly_rate.is_some() {
            self.hourly_rate = hourly_rate;
        }
        self
    }

    pub fn overtime_rate(mut self, overtime_rate: Option<u32>) -> Self {
        self.overtime_rate = overtime_rate;
        self
    }

    pub fn status(mut self, status: ContractStatus) -> Self {
        self.status = status;
        self
    }

    pub fn employee(mut self, employee: ContractEmployee) -> Self {
        self.employees.push(employee);
        self
    }

    pub fn renewed_from(mut self, contract_id: ContractId) -> Self {
        self.renewed_from = Some(contract_id);
        self
    }

    pub fn build(self) -> Result<NewContract, DraftError> {
        let factory_id = self.factory_id.ok_or(DraftError::MissingField("factory"))?;
        let line_id = self.line_id.ok_or(DraftError::MissingField("line"))?;
        let site_name = self
            .site_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(DraftError::MissingField("site name"))?;
        let start_date = self.start_date.ok_or(DraftError::MissingField("start date"))?;
        let end_date = self.end_date.ok_or(DraftError::MissingField("end date"))?;

        if end_date < start_date {
            return Err(DraftError::InvalidPeriod {
                start: start_date,
                end: end_date,
            });
        }

        if self.hourly_rate == Some(0) || self.overtime_rate == Some(0) {
            return Err(DraftError::ZeroRate);
        }

        if !matches!(self.status, ContractStatus::Draft | ContractStatus::Active) {
            return Err(DraftError::InvalidInitialStatus(self.status));
        }

        if let Some(entry) = self
            .employees
            .iter()
            .find(|entry| !entry.fits_within(start_date, end_date))
        {
            return Err(DraftError::AssignmentOutsidePeriod {
                employee: entry.employee_id.0,
            });
        }

        let overtime_rate = self
            .overtime_rate
            .or_else(|| self.hourly_rate.map(overtime_rate_for));

        Ok(NewContract {
            factory_id,
            line_id,
            site_name,
            start_date,
            end_date,
            hourly_rate: self.hourly_rate,
            overtime_rate,
            status: self.status,
            employees: self.employees,
            renewed_from: self.renewed_from,
        })
    }
}
