use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for dispatch contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContractId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmployeeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactoryId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineId(pub u64);

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FactoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human readable contract number, sequential within the contract's start month.
///
/// Rendered as `{prefix}-{YYYYMM}-{seq:03}`, e.g. `KK-202501-007`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractNumber(pub String);

impl ContractNumber {
    pub fn allocate(prefix: &str, start_date: NaiveDate, sequence: u32) -> Self {
        Self(format!(
            "{prefix}-{}-{sequence:03}",
            start_date.format("%Y%m")
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of an individual dispatch contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    #[default]
    Draft,
    Active,
    Expired,
    Cancelled,
    Renewed,
}

impl ContractStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Renewed => "renewed",
        }
    }

    /// Directed transition set: draft -> active|cancelled, active -> expired|renewed|cancelled.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Active)
                | (Self::Draft, Self::Cancelled)
                | (Self::Active, Self::Expired)
                | (Self::Active, Self::Renewed)
                | (Self::Active, Self::Cancelled)
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Expired | Self::Cancelled | Self::Renewed)
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("contract status cannot move from {from} to {to}")]
pub struct StatusTransitionError {
    pub from: ContractStatus,
    pub to: ContractStatus,
}

/// One worker on a contract's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEmployee {
    pub employee_id: EmployeeId,
    /// Per-employee override; `None` means the contract rate applies.
    pub hourly_rate: Option<u32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub assigned_by: String,
}

impl ContractEmployee {
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && start <= self.end_date
    }

    /// Ordered range lying inside `start..=end`.
    pub fn fits_within(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= self.end_date && start <= self.start_date && self.end_date <= end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub number: ContractNumber,
    pub factory_id: FactoryId,
    pub line_id: LineId,
    pub site_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub hourly_rate: Option<u32>,
    pub overtime_rate: Option<u32>,
    pub status: ContractStatus,
    pub employees: Vec<ContractEmployee>,
    #[serde(default)]
    pub renewed_from: Option<ContractId>,
    /// Bumped by the store on every write; stale copies are rejected.
    #[serde(default)]
    pub revision: u64,
}

impl Contract {
    pub fn worker_count(&self) -> usize {
        self.employees.len()
    }

    pub fn is_at(&self, factory_id: FactoryId, line_id: LineId) -> bool {
        self.factory_id == factory_id && self.line_id == line_id
    }

    /// Active and still running on `date` or later.
    pub fn is_open_on(&self, date: NaiveDate) -> bool {
        self.status == ContractStatus::Active && self.end_date >= date
    }

    pub fn employee(&self, employee_id: EmployeeId) -> Option<&ContractEmployee> {
        self.employees
            .iter()
            .find(|entry| entry.employee_id == employee_id)
    }

    /// First roster entry whose range is reversed or leaves the contract period.
    pub fn misplaced_assignment(&self) -> Option<&ContractEmployee> {
        self.employees
            .iter()
            .find(|entry| !entry.fits_within(self.start_date, self.end_date))
    }

    pub fn effective_rate_for(&self, employee_id: EmployeeId) -> Option<u32> {
        self.employee(employee_id)
            .and_then(|entry| entry.hourly_rate)
            .or(self.hourly_rate)
    }

    pub fn transition(&mut self, next: ContractStatus) -> Result<(), StatusTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(StatusTransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Statutory 25% overtime premium applied to the base hourly rate, rounded up to the yen.
pub fn overtime_rate_for(hourly_rate: u32) -> u32 {
    let premium = (u64::from(hourly_rate) * 125).div_ceil(100);
    u32::try_from(premium).unwrap_or(u32::MAX)
}

/// Client site with its production lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factory {
    pub id: FactoryId,
    pub company_name: String,
    pub plant_name: String,
    #[serde(default)]
    pub address: Option<String>,
    /// Legal ceiling (抵触日) after which no dispatch at this site may extend.
    #[serde(default)]
    pub conflict_date: Option<NaiveDate>,
    #[serde(default)]
    pub lines: Vec<FactoryLine>,
}

impl Factory {
    pub fn line(&self, line_id: LineId) -> Option<&FactoryLine> {
        self.lines.iter().find(|line| line.id == line_id)
    }

    pub fn site_name(&self, line: &FactoryLine) -> String {
        format!("{} {} ({})", self.company_name, self.plant_name, line.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryLine {
    pub id: LineId,
    pub name: String,
    #[serde(default)]
    pub default_hourly_rate: Option<u32>,
    #[serde(default)]
    pub supervisor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub employee_number: String,
    pub full_name: String,
    /// Default billing rate compared against contract rates.
    #[serde(default)]
    pub billing_rate: Option<u32>,
    #[serde(default)]
    pub hourly_wage: Option<u32>,
}
