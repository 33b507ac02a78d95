use crate::cli::ServeArgs;
use crate::infra::{file_store, AppState};
use crate::routes::with_reward_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use reward_router::config::AppConfig;
use reward_router::error::AppError;
use reward_router::rewards::RewardService;
use reward_router::telemetry;
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

    let store = file_store(&config);
    let reward_service = Arc::new(RewardService::new(store, config.milestone));

    let app = with_reward_routes(reward_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        data_dir = %config.storage.data_dir.display(),
        "reward router ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
