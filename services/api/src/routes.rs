use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use trialgate::workflows::registration::{
    registration_router, Notifier, ObjectStore, RegistrationRepository, RegistrationService,
    TeamDirectory,
};

pub(crate) fn with_registration_routes<R, S, N, T>(
    service: Arc<RegistrationService<R, S, N, T>>,
) -> axum::Router
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    registration_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body.get("status"), Some(&json!("ok")));
    }
}
