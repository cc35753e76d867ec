use axum::async_trait;
use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::domain::{ActorRole, UserId};

/// Header carrying the authenticated account id, injected by the upstream
/// identity service. The core trusts it without re-validating credentials.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Header carrying the authenticated role label.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Authenticated caller as asserted by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: ActorRole,
}

impl Actor {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthRejection> {
        let id = headers
            .get(ACTOR_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AuthRejection::MissingIdentity)?;
        let role = headers
            .get(ACTOR_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(ActorRole::from_label)
            .ok_or(AuthRejection::UnknownRole)?;

        Ok(Actor {
            id: UserId(id.to_string()),
            role,
        })
    }
}

/// Rejection produced when the identity headers are absent or malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    MissingIdentity,
    UnknownRole,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let detail = match self {
            AuthRejection::MissingIdentity => "missing actor identity",
            AuthRejection::UnknownRole => "unknown actor role",
        };
        let body = Json(json!({ "error": detail, "kind": "unauthenticated" }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Actor::from_headers(&parts.headers)
    }
}

/// Single capability-check decorator layered once per route group; handlers
/// never repeat the role test.
pub(crate) async fn require_role(role: ActorRole, request: Request, next: Next) -> Response {
    match Actor::from_headers(request.headers()) {
        Err(rejection) => rejection.into_response(),
        Ok(actor) if actor.role == role => next.run(request).await,
        Ok(actor) => {
            let body = Json(json!({
                "error": format!("role {} lacks access to this operation", actor.role.label()),
                "kind": "forbidden",
            }));
            (StatusCode::FORBIDDEN, body).into_response()
        }
    }
}

/// Any authenticated actor passes; instance-level ownership checks stay with
/// the service.
pub(crate) async fn require_authenticated(request: Request, next: Next) -> Response {
    match Actor::from_headers(request.headers()) {
        Err(rejection) => rejection.into_response(),
        Ok(_) => next.run(request).await,
    }
}
