use crate::cli::ServeArgs;
use crate::infra::{build_engine, demo_roster, AppState, InMemoryEmployeeRepository};
use crate::routes::with_workforce_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use talent_risk::config::{AppConfig, AppEnvironment};
use talent_risk::error::AppError;
use talent_risk::telemetry;
use talent_risk::workforce::RiskService;
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

    let engine = build_engine(&config.scoring)?;
    let repository = if config.environment == AppEnvironment::Development || args.seed_demo {
        let roster = demo_roster()?;
        info!(employees = roster.len(), "seeding in-memory store with demo roster");
        InMemoryEmployeeRepository::seeded(roster)?
    } else {
        InMemoryEmployeeRepository::default()
    };
    let risk_service = Arc::new(RiskService::new(Arc::new(repository), engine));

    let app = with_workforce_routes(risk_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "talent risk service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
