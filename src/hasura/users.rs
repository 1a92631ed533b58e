//! User lookups and the last-login mutation.

use crate::hasura::{Hasura, HasuraError};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

pub(crate) const HEALTH_QUERY: &str = r"
    query HealthCheck {
        users(limit: 1) {
            id
        }
    }
";

const FIND_ACTIVE_USER: &str = r"
    query FindUser($email: String!) {
        users(where: { email: { _eq: $email }, is_active: { _eq: true } }) {
            id
            email
            full_name
            password_hash
            password_salt
            role
            is_active
            created_at
            updated_at
            created_by
            last_login
        }
    }
";

const USER_BY_ID: &str = r"
    query CheckUser($id: uuid!) {
        users_by_pk(id: $id) {
            id
            email
            full_name
            role
            is_active
            created_at
            updated_at
            created_by
            last_login
        }
    }
";

const UPDATE_LAST_LOGIN: &str = r"
    mutation UpdateLastLogin($id: uuid!, $last_login: timestamptz!) {
        update_users_by_pk(pk_columns: { id: $id }, _set: { last_login: $last_login }) {
            id
        }
    }
";

/// Full credential-bearing row, only ever used inside the login flow.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub password_salt: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub created_by: Option<String>,
    pub last_login: Option<String>,
}

/// Credential-free account row for session re-validation.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRecord {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub created_by: Option<String>,
    pub last_login: Option<String>,
}

/// Fetch active accounts matching a normalized email.
///
/// Returns all matches; the caller enforces the zero/one/many semantics.
///
/// # Errors
/// Returns a [`HasuraError`] on any upstream failure.
#[instrument(skip(hasura))]
pub async fn find_active_by_email(
    hasura: &Hasura,
    email: &str,
) -> Result<Vec<UserRecord>, HasuraError> {
    let data = hasura
        .graphql(FIND_ACTIVE_USER, json!({ "email": email.trim() }))
        .await?;

    let users = data
        .get("users")
        .cloned()
        .ok_or_else(|| HasuraError::Decode("no users in response".to_string()))?;

    serde_json::from_value(users).map_err(|e| HasuraError::Decode(e.to_string()))
}

/// Fetch one account by primary key, `None` when it no longer exists.
///
/// # Errors
/// Returns a [`HasuraError`] on any upstream failure.
#[instrument(skip(hasura))]
pub async fn fetch_by_id(hasura: &Hasura, id: &str) -> Result<Option<AccountRecord>, HasuraError> {
    let data = hasura.graphql(USER_BY_ID, json!({ "id": id })).await?;

    match data.get("users_by_pk") {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(user) => serde_json::from_value(user.clone())
            .map(Some)
            .map_err(|e| HasuraError::Decode(e.to_string())),
    }
}

/// Record a successful login. Best-effort from the caller's point of view.
///
/// # Errors
/// Returns a [`HasuraError`] on any upstream failure.
#[instrument(skip(hasura))]
pub async fn update_last_login(hasura: &Hasura, id: &str) -> Result<(), HasuraError> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

    hasura
        .graphql(UPDATE_LAST_LOGIN, json!({ "id": id, "last_login": now }))
        .await?;

    debug!(id, "last login recorded");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_record_deserializes_from_graphql_row() {
        let row = serde_json::json!({
            "id": "7b51b160-9a8e-4c5c-9f6c-2f4f4fb0a001",
            "email": "ines@kadra.test",
            "full_name": "Inés Oliveira",
            "password_hash": "ab".repeat(64),
            "password_salt": "cd".repeat(32),
            "role": "hr",
            "is_active": true,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-02T00:00:00Z",
            "created_by": null,
            "last_login": null,
        });

        let user: UserRecord = serde_json::from_value(row).expect("row should deserialize");
        assert_eq!(user.email, "ines@kadra.test");
        assert!(user.is_active);
        assert_eq!(user.created_by, None);
    }

    #[test]
    fn account_record_tolerates_missing_optionals() {
        let row = serde_json::json!({
            "id": "7b51b160-9a8e-4c5c-9f6c-2f4f4fb0a001",
            "email": "ines@kadra.test",
            "full_name": "Inés Oliveira",
            "role": "hr",
            "is_active": false,
        });

        let account: AccountRecord = serde_json::from_value(row).expect("row should deserialize");
        assert!(!account.is_active);
        assert_eq!(account.last_login, None);
    }
}
