use std::sync::Arc;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::assignment::{
    AdvisorPolicy, AssignmentAction, AssignmentAdvisor, AssignmentRequest, SuggestionRequest,
};
use crate::workflows::contracts::domain::{
    Contract, ContractEmployee, ContractId, ContractNumber, ContractStatus, Employee, EmployeeId,
    Factory, FactoryId, FactoryLine, LineId,
};
use crate::workflows::contracts::repository::DispatchRepository;
use crate::workflows::contracts::store::InMemoryDispatchStore;

/// No conflict date; line 10 hosts contract #42, line 11 has no open contract.
pub(super) const MOTORS: FactoryId = FactoryId(1);
pub(super) const ASSEMBLY: LineId = LineId(10);
pub(super) const PAINT: LineId = LineId(11);

/// Conflict date 2025-03-01.
pub(super) const FOODS: FactoryId = FactoryId(2);
pub(super) const PACKING: LineId = LineId(20);

pub(super) const TANAKA: EmployeeId = EmployeeId(7);
pub(super) const SUZUKI: EmployeeId = EmployeeId(8);
pub(super) const ITO: EmployeeId = EmployeeId(9);

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn employee(id: EmployeeId, name: &str, billing_rate: Option<u32>) -> Employee {
    Employee {
        id,
        employee_number: format!("E-{:04}", id.0),
        full_name: name.to_string(),
        billing_rate,
        hourly_wage: billing_rate.map(|rate| rate * 4 / 5),
    }
}

fn line(id: LineId, name: &str, default_hourly_rate: Option<u32>) -> FactoryLine {
    FactoryLine {
        id,
        name: name.to_string(),
        default_hourly_rate,
        supervisor: Some("Okada".to_string()),
    }
}

pub(super) fn roster_contract(
    id: u64,
    line_id: LineId,
    status: ContractStatus,
    period: (NaiveDate, NaiveDate),
    workers: &[u64],
) -> Contract {
    let (start_date, end_date) = period;
    Contract {
        id: ContractId(id),
        number: ContractNumber::allocate("KK", start_date, id as u32),
        factory_id: MOTORS,
        line_id,
        site_name: "Chugoku Motors Mizushima (Assembly)".to_string(),
        start_date,
        end_date,
        hourly_rate: Some(1500),
        overtime_rate: Some(1875),
        status,
        employees: workers
            .iter()
            .map(|worker| ContractEmployee {
                employee_id: EmployeeId(*worker),
                hourly_rate: None,
                start_date,
                end_date,
                assigned_by: "seed".to_string(),
            })
            .collect(),
        renewed_from: None,
        revision: 0,
    }
}

pub(super) fn seeded_store() -> Arc<InMemoryDispatchStore> {
    let store = Arc::new(InMemoryDispatchStore::default());

    for worker in [
        employee(TANAKA, "Tanaka Yui", Some(1500)),
        employee(SUZUKI, "Suzuki Ren", Some(1800)),
        employee(ITO, "Ito Mei", None),
    ] {
        store.upsert_employee(worker).expect("employee seeded");
    }

    store
        .upsert_factory(Factory {
            id: MOTORS,
            company_name: "Chugoku Motors".to_string(),
            plant_name: "Mizushima".to_string(),
            address: Some("Kurashiki, Okayama".to_string()),
            conflict_date: None,
            lines: vec![
                line(ASSEMBLY, "Assembly", Some(1500)),
                line(PAINT, "Paint", Some(1450)),
            ],
        })
        .expect("factory seeded");
    store
        .upsert_factory(Factory {
            id: FOODS,
            company_name: "Bizen Foods".to_string(),
            plant_name: "Okayama".to_string(),
            address: None,
            conflict_date: Some(date(2025, 3, 1)),
            lines: vec![line(PACKING, "Packing", None)],
        })
        .expect("factory seeded");

    store
        .restore_contract(roster_contract(
            42,
            ASSEMBLY,
            ContractStatus::Active,
            (date(2025, 1, 1), date(2025, 6, 30)),
            &[101, 102, 103],
        ))
        .expect("contract 42 restored");

    store
}

pub(super) fn advisor(store: Arc<InMemoryDispatchStore>) -> AssignmentAdvisor<InMemoryDispatchStore> {
    AssignmentAdvisor::new(store, AdvisorPolicy::default())
}

pub(super) fn suggestion(
    employee_id: EmployeeId,
    factory_id: FactoryId,
    line_id: LineId,
    start_date: NaiveDate,
) -> SuggestionRequest {
    SuggestionRequest {
        employee_id,
        factory_id,
        factory_line_id: line_id,
        start_date,
        duration_months: None,
    }
}

pub(super) fn assignment(
    action: AssignmentAction,
    employee_id: EmployeeId,
    factory_id: FactoryId,
    line_id: LineId,
    start_date: NaiveDate,
) -> AssignmentRequest {
    AssignmentRequest {
        employee_id,
        factory_id,
        factory_line_id: line_id,
        start_date,
        action,
        existing_contract_id: None,
        duration_months: None,
        hourly_rate: None,
    }
}

pub(super) async fn read_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
