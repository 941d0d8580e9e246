use crate::cli::ServeArgs;
use crate::infra::{seeded_store, AppState};
use crate::routes::with_dispatch_routes;
use crate::session::SessionGate;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Local;
use dispatch_contracts::config::AppConfig;
use dispatch_contracts::error::AppError;
use dispatch_contracts::telemetry;
use dispatch_contracts::workflows::assignment::{AdvisorPolicy, AssignmentAdvisor};
use dispatch_contracts::workflows::contracts::ContractService;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let today = Local::now().date_naive();
    let (store, summary) = seeded_store(&config.advisor, &config.seed, today)?;
    info!(
        employees = summary.employees_inserted + summary.employees_updated,
        factories = summary.factories_inserted + summary.factories_updated,
        lines = summary.lines,
        "roster loaded"
    );

    let contracts = Arc::new(ContractService::new(store.clone()));
    contracts.expire_due(today)?;

    let policy = AdvisorPolicy::from(&config.advisor);
    let advisor = Arc::new(AssignmentAdvisor::new(store, policy));
    let gate = SessionGate::new(config.session.api_token.as_deref());

    let app = with_dispatch_routes(advisor, contracts, gate)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "dispatch contract service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
