use std::sync::atomic::{AtomicU64, Ordering};

pub const ANONYMOUS_OPERATOR: &str = "anonymous";
pub const SYSTEM_OPERATOR: &str = "system";

static REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Per-request caller context, attached by the HTTP middleware and passed explicitly
/// into every write so audit fields never come from ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub operator: String,
    pub request_id: u64,
}

impl SessionContext {
    pub fn new(operator: impl Into<String>) -> Self {
        let operator = operator.into();
        let operator = if operator.trim().is_empty() {
            ANONYMOUS_OPERATOR.to_string()
        } else {
            operator.trim().to_string()
        };

        Self {
            operator,
            request_id: REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Context for CLI runs and internal jobs.
    pub fn system() -> Self {
        Self::new(SYSTEM_OPERATOR)
    }
}
