use crate::infra::AppState;
use crate::session::{attach_session, SessionGate};
use axum::http::{header, StatusCode};
use axum::middleware;
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use dispatch_contracts::workflows::assignment::{assignment_router, AssignmentAdvisor};
use dispatch_contracts::workflows::contracts::{
    contract_router, ContractService, DispatchRepository,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_dispatch_routes<R>(
    advisor: Arc<AssignmentAdvisor<R>>,
    contracts: Arc<ContractService<R>>,
    gate: SessionGate,
) -> axum::Router
where
    R: DispatchRepository + 'static,
{
    assignment_router(advisor)
        .merge(contract_router(contracts))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .layer(middleware::from_fn_with_state(gate, attach_session))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
