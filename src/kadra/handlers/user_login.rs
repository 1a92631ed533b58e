use crate::{
    auth::{password, token::TokenService},
    hasura::{users, Hasura},
    kadra::handlers::{timestamp, validate_login},
};
use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserLogin {
    email: String,
    password: String,
}

/// Sanitized account projection. Hash and salt never leave the server.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

impl LoginResponse {
    fn failure(error: &str, timestamp: String) -> Self {
        Self {
            success: false,
            token: None,
            user: None,
            error: Some(error.to_string()),
            timestamp,
        }
    }
}

/// The one generic credentials failure. Unknown email and wrong password
/// both come through here so the two cases are indistinguishable to the
/// caller.
fn invalid_credentials(timestamp: String) -> (StatusCode, Json<LoginResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(LoginResponse::failure("Invalid credentials", timestamp)),
    )
}

#[utoipa::path(
    post,
    path= "/api/login",
    request_body = UserLogin,
    responses (
        (status = 200, description = "Login successful", body = [LoginResponse], content_type = "application/json"),
        (status = 400, description = "Malformed or invalid input", body = [LoginResponse]),
        (status = 401, description = "Invalid credentials", body = [LoginResponse]),
        (status = 500, description = "Internal error", body = [LoginResponse]),
        (status = 503, description = "Data layer unavailable", body = [LoginResponse]),
    ),
    tag= "login"
)]
// axum handler for login
#[instrument(skip(hasura, tokens, payload))]
pub async fn login(
    hasura: Extension<Hasura>,
    tokens: Extension<TokenService>,
    payload: Option<Json<UserLogin>>,
) -> impl IntoResponse {
    let ts = timestamp();

    // Malformed requests are rejected before any data-layer access.
    let Some(Json(request)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(LoginResponse::failure("Invalid JSON in request body", ts)),
        );
    };

    if let Err(message) = validate_login(&request.email, &request.password) {
        debug!(message, "login request rejected");
        return (
            StatusCode::BAD_REQUEST,
            Json(LoginResponse::failure(message, ts)),
        );
    }

    // Probe the data layer before the credential lookup; a dead upstream is
    // a 503, not a credentials failure.
    let health = hasura.health().await;
    if !health.healthy {
        error!(message = %health.message, "data layer unhealthy");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(LoginResponse::failure("Service unavailable", ts)),
        );
    }

    let matches = match users::find_active_by_email(&hasura, &request.email).await {
        Ok(matches) => matches,
        Err(err) => {
            error!(error = %err, "user lookup failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(LoginResponse::failure("Internal server error", ts)),
            );
        }
    };

    let user = match matches.as_slice() {
        [] => return invalid_credentials(ts),
        [user] => user,
        _ => {
            // Duplicate active emails are a data-integrity fault; fail closed.
            error!(email = %request.email, "multiple active accounts for one email");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(LoginResponse::failure("Internal server error", ts)),
            );
        }
    };

    if !password::verify(&request.password, &user.password_hash, &user.password_salt) {
        return invalid_credentials(ts);
    }

    let token = match tokens.issue(&user.id, &user.role, &user.email, &user.full_name) {
        Ok(token) => token,
        Err(err) => {
            error!(error = %err, "token issuance failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(LoginResponse::failure(
                    "Failed to create authentication token",
                    ts,
                )),
            );
        }
    };

    // Best effort: a failed bookkeeping write must not fail the login.
    if let Err(err) = users::update_last_login(&hasura, &user.id).await {
        warn!(error = %err, "failed to update last login");
    }

    (
        StatusCode::OK,
        Json(LoginResponse {
            success: true,
            token: Some(token),
            user: Some(PublicUser {
                id: user.id.clone(),
                email: user.email.clone(),
                full_name: user.full_name.clone(),
                role: user.role.clone(),
                is_active: user.is_active,
            }),
            error: None,
            timestamp: ts,
        }),
    )
}
