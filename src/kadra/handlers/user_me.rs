use crate::{
    auth::{
        session::{self, Identity, SessionError},
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
pub struct MeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Identity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "errorCode", skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub timestamp: String,
}

/// Machine-readable failure codes for the profile endpoint, so front-end
/// callers can branch without string-matching messages.
fn failure(err: &SessionError) -> (StatusCode, &'static str, &'static str) {
    match err {
        SessionError::MissingToken => (
            StatusCode::UNAUTHORIZED,
            "AUTH_001",
            "Authorization header missing",
        ),
        SessionError::Token(TokenError::Malformed) => {
            (StatusCode::UNAUTHORIZED, "AUTH_002", "Invalid token format")
        }
        SessionError::Token(TokenError::Expired) => {
            (StatusCode::UNAUTHORIZED, "AUTH_003", "Token expired")
        }
        SessionError::Token(TokenError::BadSignature) => (
            StatusCode::UNAUTHORIZED,
            "AUTH_004",
            "Invalid token signature",
        ),
        SessionError::Token(TokenError::NotYetValid) => (
            StatusCode::UNAUTHORIZED,
            "AUTH_005",
            "Token not active yet",
        ),
        SessionError::Token(TokenError::MissingClaims) => (
            StatusCode::UNAUTHORIZED,
            "AUTH_006",
            "Invalid token payload",
        ),
        SessionError::AccountMissing => (StatusCode::NOT_FOUND, "USER_001", "User not found"),
        SessionError::AccountInactive => (StatusCode::UNAUTHORIZED, "USER_002", "User is inactive"),
        SessionError::InvalidRole => (StatusCode::UNAUTHORIZED, "USER_004", "User role invalid"),
        SessionError::Upstream(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "DB_002",
            "Database query failed",
        ),
    }
}

fn rejection(err: &SessionError, ts: String) -> (StatusCode, Json<MeResponse>) {
    let (status, code, message) = failure(err);

    (
        status,
        Json(MeResponse {
            success: false,
            user: None,
            error: Some(message.to_string()),
            error_code: Some(code.to_string()),
            timestamp: ts,
        }),
    )
}

#[utoipa::path(
    get,
    path= "/api/me",
    responses (
        (status = 200, description = "Current profile", body = [MeResponse], content_type = "application/json"),
        (status = 401, description = "Token or account invalid", body = [MeResponse]),
        (status = 404, description = "Account no longer exists", body = [MeResponse]),
        (status = 503, description = "Data layer unavailable", body = [MeResponse]),
    ),
    security(
        ("bearer" = [])
    ),
    tag= "session"
)]
// axum handler for the current-user profile; re-reads the account so role
// and email changes propagate without re-login
#[instrument(skip(hasura, tokens, headers))]
pub async fn me(
    hasura: Extension<Hasura>,
    tokens: Extension<TokenService>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let ts = timestamp();

    let Some(token) = session::bearer_token(&headers) else {
        return rejection(&SessionError::MissingToken, ts);
    };

    match session::validate(&hasura, &tokens, &token).await {
        Ok(identity) => (
            StatusCode::OK,
            Json(MeResponse {
                success: true,
                user: Some(identity),
                error: None,
                error_code: None,
                timestamp: ts,
            }),
        ),
        Err(err) => {
            if matches!(err, SessionError::Upstream(_)) {
                error!(error = %err, "profile fetch hit upstream failure");
            } else {
                debug!(error = %err, "profile request rejected");
            }

            rejection(&err, ts)
        }
    }
}
