use chrono::{Datelike, Months, NaiveDate};
use dispatch_contracts::config::{AdvisorConfig, SeedConfig};
use dispatch_contracts::error::AppError;
use dispatch_contracts::workflows::contracts::{
    Contract, ContractEmployee, ContractId, ContractNumber, ContractStatus, EmployeeId,
    FactoryId, InMemoryDispatchStore, LineId,
};
use dispatch_contracts::workflows::roster::{ImportSummary, RosterImporter};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

const SAMPLE_EMPLOYEES: &[u8] =
    include_bytes!("../../../crates/dispatch-contracts/fixtures/employees.csv");
const SAMPLE_FACTORIES: &[u8] =
    include_bytes!("../../../crates/dispatch-contracts/fixtures/factories.csv");

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Store seeded from the configured roster exports, or from the bundled sample roster
/// plus one running contract when none are configured.
pub(crate) fn seeded_store(
    advisor: &AdvisorConfig,
    seed: &SeedConfig,
    today: NaiveDate,
) -> Result<(Arc<InMemoryDispatchStore>, ImportSummary), AppError> {
    let store = Arc::new(InMemoryDispatchStore::with_prefix(&advisor.contract_prefix));
    let summary = load_roster(
        &store,
        seed.employees_csv.as_deref(),
        seed.factories_csv.as_deref(),
    )?;

    if seed.employees_csv.is_none() && seed.factories_csv.is_none() {
        if let Some(contract) = sample_contract(&advisor.contract_prefix, today) {
            info!(contract = %contract.number, "seeding sample contract");
            store
                .restore_contract(contract)
                .map_err(|err| AppError::Import(err.into()))?;
        }
    }

    Ok((store, summary))
}

/// Import roster exports into `store`; a missing path falls back to the bundled sample.
pub(crate) fn load_roster(
    store: &InMemoryDispatchStore,
    employees_csv: Option<&Path>,
    factories_csv: Option<&Path>,
) -> Result<ImportSummary, AppError> {
    let employees = match employees_csv {
        Some(path) => RosterImporter::employees_from_path(path)?,
        None => RosterImporter::employees_from_reader(SAMPLE_EMPLOYEES)?,
    };
    let factories = match factories_csv {
        Some(path) => RosterImporter::factories_from_path(path)?,
        None => RosterImporter::factories_from_reader(SAMPLE_FACTORIES)?,
    };

    Ok(RosterImporter::apply(store, employees, factories)?)
}

/// Six-month contract on the sample assembly line, starting the month `today` falls in.
fn sample_contract(prefix: &str, today: NaiveDate) -> Option<Contract> {
    let start_date = today.with_day(1)?;
    let end_date = start_date
        .checked_add_months(Months::new(6))?
        .pred_opt()?;

    Some(Contract {
        id: ContractId(42),
        number: ContractNumber::allocate(prefix, start_date, 42),
        factory_id: FactoryId(1),
        line_id: LineId(10),
        site_name: "Chugoku Motors Mizushima (Assembly)".to_string(),
        start_date,
        end_date,
        hourly_rate: Some(1500),
        overtime_rate: Some(1875),
        status: ContractStatus::Active,
        employees: [101, 102, 103]
            .into_iter()
            .map(|id| ContractEmployee {
                employee_id: EmployeeId(id),
                hourly_rate: None,
                start_date,
                end_date,
                assigned_by: "system".to_string(),
            })
            .collect(),
        renewed_from: None,
        revision: 0,
    })
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
