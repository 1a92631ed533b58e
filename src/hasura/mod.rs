//! Thin client for the hosted GraphQL data layer.
//!
//! Server-side calls authenticate with a fixed admin secret header. Every
//! operation is a single POST round trip; GraphQL-level errors are folded
//! into [`HasuraError`] and never forwarded to clients verbatim.

pub mod allowlist;
pub mod users;

use crate::cli::globals::GlobalArgs;
use anyhow::Result;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

const ADMIN_SECRET_HEADER: &str = "x-hasura-admin-secret";

#[derive(Debug, Error)]
pub enum HasuraError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("endpoint returned HTTP {0}")]
    Status(StatusCode),
    #[error("graphql errors: {0}")]
    GraphQl(String),
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

#[derive(Debug, Clone)]
pub struct Hasura {
    url: String,
    admin_secret: SecretString,
    client: Client,
}

/// Outcome of the `users(limit: 1)` connectivity probe.
#[derive(Debug)]
pub struct Health {
    pub healthy: bool,
    pub message: String,
    pub response_time_ms: u128,
}

impl Hasura {
    /// Build a client for the configured endpoint.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(globals: &GlobalArgs) -> Result<Self> {
        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;

        Ok(Self {
            url: globals.graphql_url.clone(),
            admin_secret: globals.admin_secret.clone(),
            client,
        })
    }

    /// Execute one GraphQL operation and return its `data` object.
    ///
    /// # Errors
    /// Returns a [`HasuraError`] for transport failures, non-success HTTP
    /// statuses, GraphQL-level errors and missing `data`.
    pub async fn graphql(&self, query: &str, variables: Value) -> Result<Value, HasuraError> {
        let response = self
            .client
            .post(&self.url)
            .header(ADMIN_SECRET_HEADER, self.admin_secret.expose_secret())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HasuraError::Status(response.status()));
        }

        let body: Value = response.json().await?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            let messages = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(", ");

            return Err(HasuraError::GraphQl(messages));
        }

        body.get("data")
            .cloned()
            .ok_or_else(|| HasuraError::Decode("no data in response".to_string()))
    }

    /// Probe data-layer connectivity, measuring round-trip latency.
    pub async fn health(&self) -> Health {
        let start = Instant::now();

        let result = self.graphql(users::HEALTH_QUERY, json!({})).await;
        let response_time_ms = start.elapsed().as_millis();

        match result {
            Ok(_) => {
                debug!(response_time_ms, "data layer healthy");
                Health {
                    healthy: true,
                    message: "Database connection successful".to_string(),
                    response_time_ms,
                }
            }
            Err(err) => Health {
                healthy: false,
                message: err.to_string(),
                response_time_ms,
            },
        }
    }
}
