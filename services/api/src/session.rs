use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dispatch_contracts::session::SessionContext;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

pub(crate) const OPERATOR_HEADER: &str = "x-operator";

/// Bearer token guarding `/api/` routes; `None` leaves them open.
#[derive(Clone, Default)]
pub(crate) struct SessionGate {
    api_token: Option<Arc<str>>,
}

impl SessionGate {
    pub(crate) fn new(api_token: Option<&str>) -> Self {
        Self {
            api_token: api_token.map(Arc::from),
        }
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.api_token.as_deref() else {
            return true;
        };

        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| token.trim() == expected)
    }
}

pub(crate) async fn attach_session(
    State(gate): State<SessionGate>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.uri().path().starts_with("/api/") && !gate.authorized(request.headers()) {
        warn!(path = %request.uri().path(), "rejected request without a valid api token");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "missing or invalid bearer token" })),
        )
            .into_response();
    }

    let operator = request
        .headers()
        .get(OPERATOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    request
        .extensions_mut()
        .insert(SessionContext::new(operator));

    next.run(request).await
}
