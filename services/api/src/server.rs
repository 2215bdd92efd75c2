use crate::cli::ServeArgs;
use crate::infra::{load_pitch_config, AppState, StaticIdentityProvider};
use crate::routes::with_lead_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use guest_portal::config::{AppConfig, AppEnvironment};
use guest_portal::error::AppError;
use guest_portal::telemetry;
use guest_portal::workflows::leads::{LeadPipelineService, MemoryRecordStore, PermissionRules};
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

    let identities = if config.auth.tokens.is_empty()
        && config.environment == AppEnvironment::Development
    {
        warn!("APP_AUTH_TOKENS unset; accepting demo tokens");
        StaticIdentityProvider::demo()
    } else {
        StaticIdentityProvider::from_grants(&config.auth.tokens)
    };
    if identities.is_empty() {
        warn!("no bearer tokens configured; lead endpoints will reject every request");
    }

    let pitch_config = load_pitch_config(&config.scoring)?;
    let store = Arc::new(MemoryRecordStore::new());
    let lead_service = Arc::new(LeadPipelineService::new(
        store,
        Arc::new(identities),
        pitch_config,
        PermissionRules::standard(),
    ));

    let app = with_lead_routes(lead_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "guest portal pitch engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
