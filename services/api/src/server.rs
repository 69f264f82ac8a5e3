use crate::cli::ServeArgs;
use crate::infra::{seed_catalog, AppState};
use crate::routes::with_target_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use targetline::config::AppConfig;
use targetline::error::AppError;
use targetline::telemetry;
use targetline::workflows::targets::{InMemorySubmissionStore, TargetService, TargetServiceError};
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

    let catalog = Arc::new(seed_catalog(Utc::now()).map_err(TargetServiceError::from)?);
    let store = Arc::new(InMemorySubmissionStore::default());
    let target_service = Arc::new(TargetService::new(catalog, store, config.targets.clone()));

    let app = with_target_routes(target_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        block_while_under_review = config.targets.block_while_under_review,
        quiz_pass_ratio = config.targets.quiz_pass_ratio,
        "targetline service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
