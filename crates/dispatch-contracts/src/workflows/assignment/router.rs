use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Extension, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::advisor::{AdvisorError, AssignmentAdvisor};
use super::domain::{AssignmentRequest, SuggestionRequest};
use crate::session::SessionContext;
use crate::workflows::contracts::domain::FactoryId;
use crate::workflows::contracts::repository::DispatchRepository;
use crate::workflows::contracts::router::repository_status;

#[derive(Debug, Deserialize)]
pub struct ConflictDateQuery {
    pub factory_id: FactoryId,
    pub proposed_end_date: NaiveDate,
}

/// Router exposing the advisor query, execution and conflict-date validation.
pub fn assignment_router<R>(advisor: Arc<AssignmentAdvisor<R>>) -> Router
where
    R: DispatchRepository + 'static,
{
    Router::new()
        .route("/api/v1/assignments/suggest", post(suggest_handler::<R>))
        .route("/api/v1/assignments", post(assign_handler::<R>))
        .route(
            "/api/v1/conflict-date/validate",
            post(validate_conflict_date_handler::<R>),
        )
        .with_state(advisor)
}

pub(crate) async fn suggest_handler<R>(
    State(advisor): State<Arc<AssignmentAdvisor<R>>>,
    axum::Json(request): axum::Json<SuggestionRequest>,
) -> Response
where
    R: DispatchRepository + 'static,
{
    match advisor.suggest(&request) {
        Ok(suggestion) => (StatusCode::OK, axum::Json(suggestion)).into_response(),
        Err(error) => advisor_error_response(error),
    }
}

pub(crate) async fn assign_handler<R>(
    State(advisor): State<Arc<AssignmentAdvisor<R>>>,
    session: Option<Extension<SessionContext>>,
    axum::Json(request): axum::Json<AssignmentRequest>,
) -> Response
where
    R: DispatchRepository + 'static,
{
    let session = session
        .map(|Extension(session)| session)
        .unwrap_or_else(SessionContext::system);

    match advisor.assign(&request, &session) {
        Ok(outcome) => (StatusCode::CREATED, axum::Json(outcome)).into_response(),
        Err(error) => advisor_error_response(error),
    }
}

pub(crate) async fn validate_conflict_date_handler<R>(
    State(advisor): State<Arc<AssignmentAdvisor<R>>>,
    axum::Json(query): axum::Json<ConflictDateQuery>,
) -> Response
where
    R: DispatchRepository + 'static,
{
    match advisor.validate_conflict_date(query.factory_id, query.proposed_end_date) {
        Ok(validation) => (StatusCode::OK, axum::Json(validation)).into_response(),
        Err(error) => advisor_error_response(error),
    }
}

pub(crate) fn advisor_status(error: &AdvisorError) -> StatusCode {
    match error {
        AdvisorError::NotFound(_) => StatusCode::NOT_FOUND,
        AdvisorError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AdvisorError::Repository(err) => repository_status(err),
    }
}

fn advisor_error_response(error: AdvisorError) -> Response {
    let status = advisor_status(&error);
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
