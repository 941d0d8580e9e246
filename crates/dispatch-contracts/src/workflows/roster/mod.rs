//! Master-data import from spreadsheet exports (employees and factory lines as CSV).

mod parser;

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::workflows::contracts::domain::{
    Employee, EmployeeId, Factory, FactoryId, FactoryLine, LineId,
};
use crate::workflows::contracts::repository::{DispatchRepository, RepositoryError, UpsertOutcome};
use parser::{parse_date, parse_rate, parse_rows, EmployeeRow, FactoryLineRow};

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidField {
        line: usize,
        column: &'static str,
        value: String,
    },
    InconsistentFactory {
        line: usize,
        factory_id: u64,
        column: &'static str,
    },
    DuplicateLine {
        line: usize,
        factory_id: u64,
        line_id: u64,
    },
    Repository(RepositoryError),
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read roster export: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid roster CSV data: {}", err),
            RosterImportError::InvalidField {
                line,
                column,
                value,
            } => write!(f, "line {line}: cannot read {column} from '{value}'"),
            RosterImportError::InconsistentFactory {
                line,
                factory_id,
                column,
            } => write!(
                f,
                "line {line}: factory {factory_id} has a different {column} than earlier rows"
            ),
            RosterImportError::DuplicateLine {
                line,
                factory_id,
                line_id,
            } => write!(
                f,
                "line {line}: factory {factory_id} lists line {line_id} more than once"
            ),
            RosterImportError::Repository(err) => {
                write!(f, "could not store roster data: {}", err)
            }
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::Repository(err) => Some(err),
            RosterImportError::InvalidField { .. }
            | RosterImportError::InconsistentFactory { .. }
            | RosterImportError::DuplicateLine { .. } => None,
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<RepositoryError> for RosterImportError {
    fn from(err: RepositoryError) -> Self {
        Self::Repository(err)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub employees_inserted: usize,
    pub employees_updated: usize,
    pub factories_inserted: usize,
    pub factories_updated: usize,
    pub lines: usize,
}

pub struct RosterImporter;

impl RosterImporter {
    pub fn employees_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Vec<Employee>, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::employees_from_reader(file)
    }

    pub fn employees_from_reader<R: Read>(reader: R) -> Result<Vec<Employee>, RosterImportError> {
        let mut employees = Vec::new();
        for (line, row) in parse_rows::<EmployeeRow, _>(reader)? {
            employees.push(Employee {
                id: EmployeeId(row.employee_id),
                employee_number: row.employee_number,
                full_name: row.full_name,
                billing_rate: parse_rate(line, "billing_rate", row.billing_rate.as_deref())?,
                hourly_wage: parse_rate(line, "hourly_wage", row.hourly_wage.as_deref())?,
            });
        }
        Ok(employees)
    }

    pub fn factories_from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Vec<Factory>, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::factories_from_reader(file)
    }

    /// Group one-row-per-line exports into factories, checking shared columns agree.
    pub fn factories_from_reader<R: Read>(reader: R) -> Result<Vec<Factory>, RosterImportError> {
        let mut factories: BTreeMap<u64, Factory> = BTreeMap::new();

        for (line, row) in parse_rows::<FactoryLineRow, _>(reader)? {
            let conflict_date = parse_date(line, "conflict_date", row.conflict_date.as_deref())?;
            let hourly_rate = parse_rate(line, "hourly_rate", row.hourly_rate.as_deref())?;

            let factory = factories.entry(row.factory_id).or_insert_with(|| Factory {
                id: FactoryId(row.factory_id),
                company_name: row.company_name.clone(),
                plant_name: row.plant_name.clone(),
                address: row.address.clone(),
                conflict_date,
                lines: Vec::new(),
            });

            let inconsistent = |column| RosterImportError::InconsistentFactory {
                line,
                factory_id: row.factory_id,
                column,
            };
            if factory.company_name != row.company_name {
                return Err(inconsistent("company_name"));
            }
            if factory.plant_name != row.plant_name {
                return Err(inconsistent("plant_name"));
            }
            match (factory.conflict_date, conflict_date) {
                (Some(known), Some(found)) if known != found => {
                    return Err(inconsistent("conflict_date"));
                }
                (None, Some(found)) => factory.conflict_date = Some(found),
                _ => {}
            }
            if factory.address.is_none() {
                factory.address = row.address.clone();
            }

            if factory.line(LineId(row.line_id)).is_some() {
                return Err(RosterImportError::DuplicateLine {
                    line,
                    factory_id: row.factory_id,
                    line_id: row.line_id,
                });
            }
            factory.lines.push(FactoryLine {
                id: LineId(row.line_id),
                name: row.line_name,
                default_hourly_rate: hourly_rate,
                supervisor: row.supervisor,
            });
        }

        Ok(factories.into_values().collect())
    }

    /// Upsert parsed master data into the store.
    pub fn apply<R>(
        repository: &R,
        employees: Vec<Employee>,
        factories: Vec<Factory>,
    ) -> Result<ImportSummary, RosterImportError>
    where
        R: DispatchRepository + ?Sized,
    {
        let mut summary = ImportSummary::default();

        for employee in employees {
            match repository.upsert_employee(employee)? {
                UpsertOutcome::Inserted => summary.employees_inserted += 1,
                UpsertOutcome::Updated => summary.employees_updated += 1,
            }
        }

        for factory in factories {
            summary.lines += factory.lines.len();
            match repository.upsert_factory(factory)? {
                UpsertOutcome::Inserted => summary.factories_inserted += 1,
                UpsertOutcome::Updated => summary.factories_updated += 1,
            }
        }

        info!(
            employees_inserted = summary.employees_inserted,
            employees_updated = summary.employees_updated,
            factories_inserted = summary.factories_inserted,
            factories_updated = summary.factories_updated,
            lines = summary.lines,
            "roster import applied"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::contracts::store::InMemoryDispatchStore;
    use chrono::NaiveDate;
    use std::io::Cursor;

    #[test]
    fn employees_accept_japanese_headers_and_formatted_rates() {
        let csv = "社員ID,社員番号,氏名,単価,時給\n\
7,E-0007,Tanaka Yui,\"¥1,650\",1200円\n\
8,E-0008,Suzuki Ren,,\n";
        let employees =
            RosterImporter::employees_from_reader(Cursor::new(csv)).expect("employees parse");

        assert_eq!(employees.len(), 2);
        assert_eq!(employees[0].id, EmployeeId(7));
        assert_eq!(employees[0].billing_rate, Some(1650));
        assert_eq!(employees[0].hourly_wage, Some(1200));
        assert_eq!(employees[1].billing_rate, None);
    }

    #[test]
    fn invalid_rate_reports_spreadsheet_line() {
        let csv = "employee_id,employee_number,full_name,billing_rate\n\
1,E-1,Ito Mei,1500\n\
2,E-2,Kato Sho,fifteen\n";
        let err = RosterImporter::employees_from_reader(Cursor::new(csv))
            .expect_err("rate is not numeric");
        match err {
            RosterImportError::InvalidField { line, column, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, "billing_rate");
            }
            other => panic!("expected invalid field, got {other:?}"),
        }
    }

    #[test]
    fn multiline_quoted_cells_keep_line_numbers_accurate() {
        let csv = "factory_id,company_name,plant_name,address,conflict_date,line_id,line_name\n\
1,Chugoku Motors,Mizushima,\"3-1 Mizushima\nKurashiki\",,10,Assembly\n\
1,Chugoku Motors,Mizushima,\"3-1 Mizushima\nKurashiki\",2026-02-30,11,Paint\n";
        match RosterImporter::factories_from_reader(Cursor::new(csv)) {
            Err(RosterImportError::InvalidField { line, column, .. }) => {
                assert_eq!(line, 4);
                assert_eq!(column, "conflict_date");
            }
            other => panic!("expected invalid conflict date, got {other:?}"),
        }
    }

    #[test]
    fn factory_rows_group_by_factory_and_merge_conflict_date() {
        let csv = "factory_id,company_name,plant_name,address,conflict_date,line_id,line_name,hourly_rate,supervisor\n\
1,Chugoku Motors,Mizushima,,,10,Assembly,1500,Okada\n\
1,Chugoku Motors,Mizushima,Kurashiki,2026/03/31,11,Paint,1550,\n\
2,Bizen Foods,Okayama,,2025-12-01,20,Packing,,\n";
        let factories =
            RosterImporter::factories_from_reader(Cursor::new(csv)).expect("factories parse");

        assert_eq!(factories.len(), 2);
        let motors = &factories[0];
        assert_eq!(motors.lines.len(), 2);
        assert_eq!(motors.conflict_date, NaiveDate::from_ymd_opt(2026, 3, 31));
        assert_eq!(motors.address.as_deref(), Some("Kurashiki"));
        assert_eq!(motors.lines[0].supervisor.as_deref(), Some("Okada"));
        assert_eq!(factories[1].lines[0].default_hourly_rate, None);
    }

    #[test]
    fn factory_rows_reject_conflicting_shared_columns() {
        let csv = "factory_id,company_name,plant_name,conflict_date,line_id,line_name\n\
1,Chugoku Motors,Mizushima,2026-03-31,10,Assembly\n\
1,Chugoku Motors,Mizushima,2026-04-30,11,Paint\n";
        match RosterImporter::factories_from_reader(Cursor::new(csv)) {
            Err(RosterImportError::InconsistentFactory { line, column, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(column, "conflict_date");
            }
            other => panic!("expected inconsistent factory, got {other:?}"),
        }

        let csv = "factory_id,company_name,plant_name,line_id,line_name\n\
1,Chugoku Motors,Mizushima,10,Assembly\n\
1,Chugoku Motors,Mizushima,10,Assembly B\n";
        assert!(matches!(
            RosterImporter::factories_from_reader(Cursor::new(csv)),
            Err(RosterImportError::DuplicateLine { line_id: 10, .. })
        ));
    }

    #[test]
    fn apply_counts_inserts_and_updates() {
        let store = InMemoryDispatchStore::default();
        let employees = RosterImporter::employees_from_reader(Cursor::new(
            "employee_id,full_name,billing_rate\n1,Ito Mei,1500\n",
        ))
        .expect("parse");
        let factories = RosterImporter::factories_from_reader(Cursor::new(
            "factory_id,company_name,plant_name,line_id,line_name\n1,Bizen Foods,Okayama,20,Packing\n",
        ))
        .expect("parse");

        let first = RosterImporter::apply(&store, employees.clone(), factories.clone())
            .expect("first import");
        assert_eq!(first.employees_inserted, 1);
        assert_eq!(first.factories_inserted, 1);
        assert_eq!(first.lines, 1);

        let second = RosterImporter::apply(&store, employees, factories).expect("second import");
        assert_eq!(second.employees_updated, 1);
        assert_eq!(second.factories_updated, 1);
    }

    #[test]
    fn from_path_propagates_io_errors() {
        match RosterImporter::employees_from_path("./does-not-exist.csv") {
            Err(RosterImportError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
