use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryRegistrationStore, RecordingNotifier, SignedLocalObjectStore,
    StaticTeamDirectory,
};
use crate::routes::with_registration_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::env;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use trialgate::config::AppConfig;
use trialgate::error::AppError;
use trialgate::telemetry;
use trialgate::workflows::registration::{CoachStatus, RegistrationService, UserId};

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

    let store = Arc::new(InMemoryRegistrationStore::default());
    seed_coaches(&store);
    let objects = Arc::new(SignedLocalObjectStore::new(
        signing_secret().as_bytes(),
        "https://files.trialgate.local",
    ));
    let notifier = Arc::new(RecordingNotifier::default());
    let teams = Arc::new(StaticTeamDirectory::with_defaults());
    let registration_service = Arc::new(RegistrationService::new(
        store,
        objects,
        notifier,
        teams,
        config.registration.clone(),
    ));

    let app = with_registration_routes(registration_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "registration lifecycle service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Coaches must exist as ACTIVE in the store before they can run trials;
/// APP_SEED_COACHES carries a comma-separated id list.
fn seed_coaches(store: &InMemoryRegistrationStore) {
    let raw = env::var("APP_SEED_COACHES").unwrap_or_else(|_| "coach-1".to_string());
    for id in raw.split(',') {
        let id = id.trim();
        if !id.is_empty() {
            store.seed_coach(&UserId(id.to_string()), CoachStatus::Active);
        }
    }
}

fn signing_secret() -> String {
    env::var("APP_SIGNING_SECRET").unwrap_or_else(|_| "trialgate-dev-secret".to_string())
}
