use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::auth::{require_authenticated, require_role, Actor};
use super::documents::{FileUpload, ReviewDecision};
use super::domain::{
    ActorRole, ApplicationId, DocumentId, DocumentType, DraftForm, MedicalChecklist, TrialId,
    TrialOutcome, TrialStatus, UserId,
};
use super::intake::ValidationError;
use super::repository::{Notifier, ObjectStore, RegistrationRepository, TeamDirectory};
use super::service::{ErrorKind, RegistrationError, RegistrationService};
use super::trials::TrialSchedule;

/// HTTP status for each machine-checkable failure class.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Precondition => StatusCode::PRECONDITION_FAILED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn fail(err: RegistrationError) -> Response {
    let kind = err.kind();
    let body = Json(json!({
        "error": err.to_string(),
        "kind": kind.label(),
    }));
    (status_for(kind), body).into_response()
}

/// Router builder exposing the registration lifecycle, with one role gate
/// layered per route group.
pub fn registration_router<R, S, N, T>(
    service: Arc<RegistrationService<R, S, N, T>>,
) -> Router
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    let candidate = Router::new()
        .route(
            "/api/v1/registration/application",
            put(upsert_draft_handler::<R, S, N, T>).get(status_handler::<R, S, N, T>),
        )
        .route(
            "/api/v1/registration/application/submit",
            post(submit_handler::<R, S, N, T>),
        )
        .route(
            "/api/v1/registration/documents",
            post(upload_document_handler::<R, S, N, T>),
        )
        .route_layer(middleware::from_fn(|request, next| {
            require_role(ActorRole::Candidate, request, next)
        }));

    let coach = Router::new()
        .route(
            "/api/v1/registration/trials",
            get(trials_handler::<R, S, N, T>),
        )
        .route(
            "/api/v1/registration/trials/:trial_id/medical",
            post(medical_handler::<R, S, N, T>),
        )
        .route(
            "/api/v1/registration/trials/:trial_id/medical-report",
            post(medical_report_handler::<R, S, N, T>),
        )
        .route(
            "/api/v1/registration/trials/:trial_id/evaluate",
            post(evaluate_handler::<R, S, N, T>),
        )
        .route_layer(middleware::from_fn(|request, next| {
            require_role(ActorRole::Coach, request, next)
        }));

    let admin = Router::new()
        .route(
            "/api/v1/registration/trials/:trial_id/assign",
            post(assign_handler::<R, S, N, T>),
        )
        .route(
            "/api/v1/registration/documents/:document_id/review",
            post(review_document_handler::<R, S, N, T>),
        )
        .route(
            "/api/v1/registration/review-queue",
            get(review_queue_handler::<R, S, N, T>),
        )
        .route(
            "/api/v1/registration/applications/:application_id/approve",
            post(approve_handler::<R, S, N, T>),
        )
        .route(
            "/api/v1/registration/applications/:application_id/reject",
            post(reject_handler::<R, S, N, T>),
        )
        .route(
            "/api/v1/registration/applications/:application_id/hold",
            post(hold_handler::<R, S, N, T>),
        )
        .route_layer(middleware::from_fn(|request, next| {
            require_role(ActorRole::Admin, request, next)
        }));

    let shared = Router::new()
        .route(
            "/api/v1/registration/documents/:document_id/url",
            get(document_url_handler::<R, S, N, T>),
        )
        .route_layer(middleware::from_fn(require_authenticated));

    Router::new()
        .merge(candidate)
        .merge(coach)
        .merge(admin)
        .merge(shared)
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentUploadRequest {
    pub(crate) document_type: DocumentType,
    pub(crate) file_name: String,
    pub(crate) mime_type: String,
    pub(crate) content_base64: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReportFilePayload {
    pub(crate) file_name: String,
    pub(crate) mime_type: String,
    pub(crate) content_base64: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum ReviewDecisionRequest {
    Verified,
    Rejected,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentReviewRequest {
    pub(crate) decision: ReviewDecisionRequest,
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignTrialRequest {
    pub(crate) coach_id: String,
    #[serde(default)]
    pub(crate) scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) scheduled_time: Option<String>,
    #[serde(default)]
    pub(crate) venue: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MedicalFormRequest {
    pub(crate) checklist: MedicalChecklist,
    pub(crate) verified: bool,
    #[serde(default)]
    pub(crate) report: Option<ReportFilePayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EvaluateRequest {
    pub(crate) outcome: TrialOutcome,
    #[serde(default)]
    pub(crate) notes: Option<String>,
    #[serde(default)]
    pub(crate) aadhaar_verified: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectRequest {
    pub(crate) reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HoldRequest {
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrialListQuery {
    #[serde(default)]
    pub(crate) status: Option<TrialStatus>,
}

fn decode_file(
    file_name: String,
    mime_type: String,
    content_base64: &str,
) -> Result<FileUpload, RegistrationError> {
    let bytes = BASE64
        .decode(content_base64.trim())
        .map_err(|_| ValidationError::InvalidFileEncoding)?;
    Ok(FileUpload {
        bytes,
        file_name,
        mime_type,
    })
}

pub(crate) async fn upsert_draft_handler<R, S, N, T>(
    State(service): State<Arc<RegistrationService<R, S, N, T>>>,
    actor: Actor,
    Json(form): Json<DraftForm>,
) -> Response
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    match service.create_or_update_draft(&actor.id, form) {
        Ok(application) => {
            let body = Json(json!({
                "application_id": application.id.0,
                "status": application.status.label(),
            }));
            (StatusCode::OK, body).into_response()
        }
        Err(err) => fail(err),
    }
}

pub(crate) async fn submit_handler<R, S, N, T>(
    State(service): State<Arc<RegistrationService<R, S, N, T>>>,
    actor: Actor,
) -> Response
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    match service.submit(&actor.id) {
        Ok((application, trial)) => {
            let body = Json(json!({
                "application_id": application.id.0,
                "status": application.status.label(),
                "trial_id": trial.id.0,
                "trial_status": trial.status.label(),
            }));
            (StatusCode::ACCEPTED, body).into_response()
        }
        Err(err) => fail(err),
    }
}

pub(crate) async fn status_handler<R, S, N, T>(
    State(service): State<Arc<RegistrationService<R, S, N, T>>>,
    actor: Actor,
) -> Response
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    match service.status(&actor.id) {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => fail(err),
    }
}

pub(crate) async fn upload_document_handler<R, S, N, T>(
    State(service): State<Arc<RegistrationService<R, S, N, T>>>,
    actor: Actor,
    Json(payload): Json<DocumentUploadRequest>,
) -> Response
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    let file = match decode_file(payload.file_name, payload.mime_type, &payload.content_base64) {
        Ok(file) => file,
        Err(err) => return fail(err),
    };
    match service.upload_candidate_document(&actor.id, payload.document_type, file) {
        Ok(document) => {
            let body = Json(json!({
                "document_id": document.id.0,
                "document_type": document.document_type.label(),
                "verification_status": document.verification_status.label(),
            }));
            (StatusCode::CREATED, body).into_response()
        }
        Err(err) => fail(err),
    }
}

pub(crate) async fn document_url_handler<R, S, N, T>(
    State(service): State<Arc<RegistrationService<R, S, N, T>>>,
    actor: Actor,
    Path(document_id): Path<String>,
) -> Response
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    let id = DocumentId(document_id);
    match service.resolve_document_url(&actor, &id) {
        Ok(url) => {
            let body = Json(json!({
                "url": url,
                "expires_in_secs": service.policy().signed_url_ttl_secs,
            }));
            (StatusCode::OK, body).into_response()
        }
        Err(err) => fail(err),
    }
}

pub(crate) async fn trials_handler<R, S, N, T>(
    State(service): State<Arc<RegistrationService<R, S, N, T>>>,
    actor: Actor,
    Query(query): Query<TrialListQuery>,
) -> Response
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    match service.trials().visible_to(&actor.id, query.status) {
        Ok(trials) => (StatusCode::OK, Json(trials)).into_response(),
        Err(err) => fail(err),
    }
}

pub(crate) async fn assign_handler<R, S, N, T>(
    State(service): State<Arc<RegistrationService<R, S, N, T>>>,
    _actor: Actor,
    Path(trial_id): Path<String>,
    Json(payload): Json<AssignTrialRequest>,
) -> Response
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    let id = TrialId(trial_id);
    let coach = UserId(payload.coach_id);
    let schedule = TrialSchedule {
        date: payload.scheduled_date,
        time: payload.scheduled_time,
        venue: payload.venue,
    };
    match service.trials().assign(&id, &coach, schedule) {
        Ok(trial) => (StatusCode::OK, Json(trial)).into_response(),
        Err(err) => fail(err),
    }
}

pub(crate) async fn medical_handler<R, S, N, T>(
    State(service): State<Arc<RegistrationService<R, S, N, T>>>,
    actor: Actor,
    Path(trial_id): Path<String>,
    Json(payload): Json<MedicalFormRequest>,
) -> Response
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    let id = TrialId(trial_id);
    let report = match payload.report {
        Some(file) => {
            match decode_file(file.file_name, file.mime_type, &file.content_base64) {
                Ok(decoded) => Some(decoded),
                Err(err) => return fail(err),
            }
        }
        None => None,
    };
    match service
        .trials()
        .submit_medical_form(&id, &actor.id, payload.checklist, payload.verified, report)
    {
        Ok(trial) => (StatusCode::OK, Json(trial)).into_response(),
        Err(err) => fail(err),
    }
}

pub(crate) async fn medical_report_handler<R, S, N, T>(
    State(service): State<Arc<RegistrationService<R, S, N, T>>>,
    actor: Actor,
    Path(trial_id): Path<String>,
    Json(payload): Json<ReportFilePayload>,
) -> Response
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    let id = TrialId(trial_id);
    let file = match decode_file(payload.file_name, payload.mime_type, &payload.content_base64) {
        Ok(file) => file,
        Err(err) => return fail(err),
    };
    match service.trials().upload_medical_report(&id, &actor.id, file) {
        Ok(trial) => (StatusCode::OK, Json(trial)).into_response(),
        Err(err) => fail(err),
    }
}

pub(crate) async fn evaluate_handler<R, S, N, T>(
    State(service): State<Arc<RegistrationService<R, S, N, T>>>,
    actor: Actor,
    Path(trial_id): Path<String>,
    Json(payload): Json<EvaluateRequest>,
) -> Response
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    let id = TrialId(trial_id);
    match service.trials().evaluate(
        &id,
        &actor.id,
        payload.outcome,
        payload.notes,
        payload.aadhaar_verified,
    ) {
        Ok(trial) => (StatusCode::OK, Json(trial)).into_response(),
        Err(err) => fail(err),
    }
}

pub(crate) async fn review_document_handler<R, S, N, T>(
    State(service): State<Arc<RegistrationService<R, S, N, T>>>,
    actor: Actor,
    Path(document_id): Path<String>,
    Json(payload): Json<DocumentReviewRequest>,
) -> Response
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    let id = DocumentId(document_id);
    let decision = match payload.decision {
        ReviewDecisionRequest::Verified => ReviewDecision::Verified,
        ReviewDecisionRequest::Rejected => ReviewDecision::Rejected,
    };
    match service
        .documents()
        .review(&id, decision, payload.reason, &actor.id)
    {
        Ok(document) => {
            let body = Json(json!({
                "document_id": document.id.0,
                "verification_status": document.verification_status.label(),
            }));
            (StatusCode::OK, body).into_response()
        }
        Err(err) => fail(err),
    }
}

pub(crate) async fn review_queue_handler<R, S, N, T>(
    State(service): State<Arc<RegistrationService<R, S, N, T>>>,
    _actor: Actor,
) -> Response
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    match service.review_queue() {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(err) => fail(err),
    }
}

pub(crate) async fn approve_handler<R, S, N, T>(
    State(service): State<Arc<RegistrationService<R, S, N, T>>>,
    actor: Actor,
    Path(application_id): Path<String>,
) -> Response
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    let id = ApplicationId(application_id);
    match service.approvals().approve(&id, &actor.id) {
        Ok(player) => {
            let body = Json(json!({
                "player_id": player.id.0,
                "application_id": id.0,
                "status": "APPROVED",
            }));
            (StatusCode::OK, body).into_response()
        }
        Err(err) => fail(err),
    }
}

pub(crate) async fn reject_handler<R, S, N, T>(
    State(service): State<Arc<RegistrationService<R, S, N, T>>>,
    actor: Actor,
    Path(application_id): Path<String>,
    Json(payload): Json<RejectRequest>,
) -> Response
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    let id = ApplicationId(application_id);
    match service.approvals().reject(&id, &actor.id, &payload.reason) {
        Ok(()) => {
            let body = Json(json!({
                "application_id": id.0,
                "status": "REJECTED",
            }));
            (StatusCode::OK, body).into_response()
        }
        Err(err) => fail(err),
    }
}

pub(crate) async fn hold_handler<R, S, N, T>(
    State(service): State<Arc<RegistrationService<R, S, N, T>>>,
    actor: Actor,
    Path(application_id): Path<String>,
    Json(payload): Json<HoldRequest>,
) -> Response
where
    R: RegistrationRepository + 'static,
    S: ObjectStore + 'static,
    N: Notifier + 'static,
    T: TeamDirectory + 'static,
{
    let id = ApplicationId(application_id);
    match service.approvals().hold(&id, &actor.id, payload.reason) {
        Ok(()) => {
            let body = Json(json!({
                "application_id": id.0,
                "status": "HOLD",
            }));
            (StatusCode::OK, body).into_response()
        }
        Err(err) => fail(err),
    }
}
