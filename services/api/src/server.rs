use crate::cli::ServeArgs;
use crate::infra::{roster_router, upstream_router, AppState};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use shelter::config::AppConfig;
use shelter::error::AppError;
use shelter::locale::Dictionaries;
use shelter::telemetry;
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

    let dictionaries = Arc::new(Dictionaries::load(config.default_locale)?);
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let shelter_routes = match args.roster.take() {
        Some(path) => roster_router(&path, dictionaries)?,
        None => upstream_router(&config, dictionaries)?,
    };

    let app = with_service_routes(shelter_routes)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        locale = config.default_locale.tag(),
        "shelter operations service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
