//! Session validation: re-derive the identity behind a bearer token and
//! confirm the backing account is still active.
//!
//! The account re-check runs on every call, so deactivating or deleting an
//! account invalidates its outstanding tokens immediately even though the
//! tokens themselves are stateless.

use crate::auth::token::{TokenError, TokenService};
use crate::auth::Role;
use crate::hasura::{users, Hasura, HasuraError};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Normalized identity attached to a request after validation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub created_by: Option<String>,
    pub last_login: Option<String>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("missing bearer token")]
    MissingToken,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("account not found")]
    AccountMissing,
    #[error("account is inactive")]
    AccountInactive,
    #[error("account role outside the allowed set")]
    InvalidRole,
    #[error("data layer unavailable: {0}")]
    Upstream(#[from] HasuraError),
}

/// Extract the bearer token from request headers.
///
/// Accepts `Authorization: Bearer <token>` and falls back to the raw header
/// value when the prefix is absent.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Validate a bearer token and return the current identity.
///
/// # Errors
/// Returns a [`SessionError`] distinguishing token failures from
/// account-state failures discovered on the re-fetch.
pub async fn validate(
    hasura: &Hasura,
    tokens: &TokenService,
    token: &str,
) -> Result<Identity, SessionError> {
    let claims = tokens.verify(token)?;

    // The lookup key is uuid-typed upstream; a non-uuid subject can never
    // reference an account, so reject it as a claims problem, not an
    // upstream error.
    let subject = Uuid::parse_str(&claims.sub).map_err(|_| TokenError::MissingClaims)?;

    let account = users::fetch_by_id(hasura, &subject.to_string())
        .await?
        .ok_or(SessionError::AccountMissing)?;

    if !account.is_active {
        return Err(SessionError::AccountInactive);
    }

    // The role comes from the live account, not the token, so role changes
    // propagate without re-login.
    let role = account
        .role
        .parse::<Role>()
        .map_err(|()| SessionError::InvalidRole)?;

    Ok(Identity {
        id: account.id,
        email: account.email,
        full_name: account.full_name,
        role,
        created_at: account.created_at,
        updated_at: account.updated_at,
        created_by: account.created_by,
        last_login: account.last_login,
    })
}
