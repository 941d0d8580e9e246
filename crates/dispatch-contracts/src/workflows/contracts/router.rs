use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::domain::{ContractId, ContractStatus, FactoryId, LineId};
use super::draft::ContractDraftBuilder;
use super::repository::{DispatchRepository, RepositoryError};
use super::service::{ContractError, ContractService};

/// Draft payload; every recognized field is listed, optional ones default to `None`.
#[derive(Debug, Deserialize)]
pub struct ContractDraftRequest {
    pub factory_id: FactoryId,
    pub line_id: LineId,
    pub site_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub hourly_rate: Option<u32>,
    #[serde(default)]
    pub overtime_rate: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    pub status: ContractStatus,
}

#[derive(Debug, Deserialize)]
pub struct RenewalRequest {
    pub end_date: NaiveDate,
}

pub fn contract_router<R>(service: Arc<ContractService<R>>) -> Router
where
    R: DispatchRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/contracts",
            get(list_handler::<R>).post(create_handler::<R>),
        )
        .route("/api/v1/contracts/:contract_id", get(get_handler::<R>))
        .route(
            "/api/v1/contracts/:contract_id/status",
            post(status_handler::<R>),
        )
        .route(
            "/api/v1/contracts/:contract_id/renew",
            post(renew_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn list_handler<R>(State(service): State<Arc<ContractService<R>>>) -> Response
where
    R: DispatchRepository + 'static,
{
    match service.list() {
        Ok(contracts) => (StatusCode::OK, axum::Json(contracts)).into_response(),
        Err(error) => contract_error_response(error),
    }
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<ContractService<R>>>,
    axum::Json(request): axum::Json<ContractDraftRequest>,
) -> Response
where
    R: DispatchRepository + 'static,
{
    let draft = ContractDraftBuilder::new()
        .factory(request.factory_id)
        .line(request.line_id)
        .site_name(request.site_name)
        .period(request.start_date, request.end_date)
        .hourly_rate(request.hourly_rate)
        .overtime_rate(request.overtime_rate)
        .build();

    let result = draft
        .map_err(ContractError::from)
        .and_then(|draft| service.create_draft(draft));
    match result {
        Ok(contract) => (StatusCode::CREATED, axum::Json(contract)).into_response(),
        Err(error) => contract_error_response(error),
    }
}

pub(crate) async fn get_handler<R>(
    State(service): State<Arc<ContractService<R>>>,
    Path(contract_id): Path<u64>,
) -> Response
where
    R: DispatchRepository + 'static,
{
    match service.get(ContractId(contract_id)) {
        Ok(contract) => (StatusCode::OK, axum::Json(contract)).into_response(),
        Err(error) => contract_error_response(error),
    }
}

pub(crate) async fn status_handler<R>(
    State(service): State<Arc<ContractService<R>>>,
    Path(contract_id): Path<u64>,
    axum::Json(request): axum::Json<StatusChangeRequest>,
) -> Response
where
    R: DispatchRepository + 'static,
{
    match service.transition(ContractId(contract_id), request.status) {
        Ok(contract) => (StatusCode::OK, axum::Json(contract)).into_response(),
        Err(error) => contract_error_response(error),
    }
}

pub(crate) async fn renew_handler<R>(
    State(service): State<Arc<ContractService<R>>>,
    Path(contract_id): Path<u64>,
    axum::Json(request): axum::Json<RenewalRequest>,
) -> Response
where
    R: DispatchRepository + 'static,
{
    match service.renew(ContractId(contract_id), request.end_date) {
        Ok(contract) => (StatusCode::CREATED, axum::Json(contract)).into_response(),
        Err(error) => contract_error_response(error),
    }
}

pub(crate) fn repository_status(error: &RepositoryError) -> StatusCode {
    match error {
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn contract_status(error: &ContractError) -> StatusCode {
    match error {
        ContractError::NotFound(_) | ContractError::UnknownSite { .. } => StatusCode::NOT_FOUND,
        ContractError::Transition(_)
        | ContractError::Draft(_)
        | ContractError::RenewalPeriod { .. }
        | ContractError::ConflictDateExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ContractError::Repository(err) => repository_status(err),
    }
}

fn contract_error_response(error: ContractError) -> Response {
    let status = contract_status(&error);

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
