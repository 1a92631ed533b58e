use crate::{hasura::Hasura, kadra::handlers::timestamp};
use axum::{
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use serde_json::json;
use utoipa::ToSchema;

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct Health {
    status: String,
}

#[utoipa::path(
    get,
    path= "/api/health",
    responses (
        (status = 200, description = "Service and data-layer health", body = [Health], content_type = "application/json"),
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(hasura: Extension<Hasura>) -> impl IntoResponse {
    let db = hasura.health().await;

    let body = Json(json!({
        "status": if db.healthy { "ok" } else { "degraded" },
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "database": {
            "status": if db.healthy { "healthy" } else { "unhealthy" },
            "message": db.message,
            "response_time_ms": db.response_time_ms,
        },
        "timestamp": timestamp(),
    }));

    let mut headers = HeaderMap::new();

    if let Ok(value) = format!(
        "{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
    .parse()
    {
        headers.insert("X-App", value);
    }

    (headers, body)
}
