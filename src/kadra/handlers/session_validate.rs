use crate::{
    auth::{
        session::{self, SessionError},
        token::{TokenError, TokenService},
    },
    hasura::Hasura,
    kadra::handlers::timestamp,
};
use axum::{
    extract::Extension, http::HeaderMap, http::StatusCode, response::IntoResponse, Json,
};
use serde::Serialize;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Debug)]
pub struct SessionUser {
    pub id: String,
    pub username: String,
    pub role: String,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct ValidateResponse {
    pub success: bool,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl ValidateResponse {
    fn invalid(error: &str, timestamp: String) -> Self {
        Self {
            success: false,
            valid: false,
            user: None,
            error: Some(error.to_string()),
            timestamp,
        }
    }
}

/// Each internal failure kind keeps its own message, but every one of them
/// is a 401 except upstream trouble, which is a 503.
fn failure(err: &SessionError) -> (StatusCode, &'static str) {
    match err {
        SessionError::MissingToken => (StatusCode::UNAUTHORIZED, "Authorization header missing"),
        SessionError::Token(TokenError::Malformed) => {
            (StatusCode::UNAUTHORIZED, "Invalid token format")
        }
        SessionError::Token(TokenError::BadSignature) => {
            (StatusCode::UNAUTHORIZED, "Invalid token signature")
        }
        SessionError::Token(TokenError::Expired) => (StatusCode::UNAUTHORIZED, "Token expired"),
        SessionError::Token(TokenError::NotYetValid) => {
            (StatusCode::UNAUTHORIZED, "Token not active yet")
        }
        SessionError::Token(TokenError::MissingClaims) => {
            (StatusCode::UNAUTHORIZED, "Invalid token payload")
        }
        SessionError::AccountMissing => (StatusCode::UNAUTHORIZED, "User not found"),
        SessionError::AccountInactive => (StatusCode::UNAUTHORIZED, "User is inactive"),
        SessionError::InvalidRole => (StatusCode::UNAUTHORIZED, "User role invalid"),
        SessionError::Upstream(_) => (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable"),
    }
}

#[utoipa::path(
    post,
    path= "/api/validate",
    responses (
        (status = 200, description = "Token valid", body = [ValidateResponse], content_type = "application/json"),
        (status = 401, description = "Token or account invalid", body = [ValidateResponse]),
        (status = 503, description = "Data layer unavailable", body = [ValidateResponse]),
    ),
    security(
        ("bearer" = [])
    ),
    tag= "session"
)]
// axum handler for token validation
#[instrument(skip(hasura, tokens, headers))]
pub async fn validate(
    hasura: Extension<Hasura>,
    tokens: Extension<TokenService>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let ts = timestamp();

    let Some(token) = session::bearer_token(&headers) else {
        let (status, message) = failure(&SessionError::MissingToken);
        return (status, Json(ValidateResponse::invalid(message, ts)));
    };

    match session::validate(&hasura, &tokens, &token).await {
        Ok(identity) => (
            StatusCode::OK,
            Json(ValidateResponse {
                success: true,
                valid: true,
                user: Some(SessionUser {
                    id: identity.id.clone(),
                    username: identity.email,
                    role: identity.role.to_string(),
                }),
                error: None,
                timestamp: ts,
            }),
        ),
        Err(err) => {
            if matches!(err, SessionError::Upstream(_)) {
                error!(error = %err, "session validation hit upstream failure");
            } else {
                debug!(error = %err, "session rejected");
            }

            let (status, message) = failure(&err);
            (status, Json(ValidateResponse::invalid(message, ts)))
        }
    }
}
