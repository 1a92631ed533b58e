use crate::kadra::{admission, handlers::timestamp};
use axum::{
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use serde_json::json;

/// Diagnostic view of client-IP resolution. Lives under `/api/` so it stays
/// reachable from a not-yet-allowlisted browser while wiring up entries.
#[utoipa::path(
    get,
    path= "/api/debug-ip",
    responses (
        (status = 200, description = "Resolved client IP and proxy headers", content_type = "application/json"),
    ),
    tag= "health"
)]
pub async fn debug_ip(headers: HeaderMap) -> impl IntoResponse {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    Json(json!({
        "ip": admission::client_ip(&headers),
        "headers": {
            "x-forwarded-for": header("x-forwarded-for"),
            "x-real-ip": header("x-real-ip"),
            "cf-connecting-ip": header("cf-connecting-ip"),
        },
        "timestamp": timestamp(),
    }))
}
