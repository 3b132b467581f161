use crate::cli::ServeArgs;
use crate::infra::{AppState, ConfiguredAdminAuthorizer, InMemoryAffiliationStore};
use crate::routes::with_affiliation_routes;
use affiliation::config::AppConfig;
use affiliation::error::AppError;
use affiliation::telemetry;
use affiliation::workflows::affiliation::AffiliationApi;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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

    if config.workflow.admin.is_none() {
        warn!("reviewer credentials not configured; admin sign-in is disabled");
    }

    let store = Arc::new(InMemoryAffiliationStore::seeded());
    let authorizer = Arc::new(ConfiguredAdminAuthorizer::new(config.workflow.admin.clone()));
    let api = Arc::new(AffiliationApi::new(
        store,
        authorizer,
        config.workflow.step_validator(),
    ));

    let app = with_affiliation_routes(api)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        require_signature = config.workflow.validation.require_signature,
        reference_date = ?config.workflow.reference_date,
        "affiliation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
