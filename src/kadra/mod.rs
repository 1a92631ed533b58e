use crate::{
    auth::{session::Identity, token::TokenService, Role},
    cli::globals::GlobalArgs,
    hasura::Hasura,
    kadra::handlers::{
        debug_ip::__path_debug_ip, health, health::__path_health, session_validate,
        session_validate::__path_validate, user_login, user_login::__path_login, user_me,
        user_me::__path_me,
    },
};
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware,
    routing::{get, post},
    Extension, Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

pub mod admission;
pub(crate) mod handlers;

#[derive(OpenApi)]
#[openapi(
    paths(health, login, validate, me, debug_ip),
    components(schemas(
        health::Health,
        user_login::UserLogin,
        user_login::LoginResponse,
        user_login::PublicUser,
        session_validate::ValidateResponse,
        session_validate::SessionUser,
        user_me::MeResponse,
        Identity,
        Role,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "kadra", description = "HR platform access control API")
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    globals: &GlobalArgs,
    hasura: Hasura,
    tokens: TokenService,
) -> Result<()> {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    let app = Router::new()
        .route("/", get(|| async { "🗂" }))
        .route("/api/login", post(handlers::login))
        .route("/api/validate", post(handlers::validate))
        .route("/api/me", get(handlers::me))
        .route("/api/debug-ip", get(handlers::debug_ip))
        .merge(SwaggerUi::new("/docs").url("/api/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(globals.clone()))
                .layer(Extension(hasura.clone()))
                .layer(Extension(tokens))
                .layer(middleware::from_fn(admission::gate)),
        )
        .route(
            "/api/health",
            get(handlers::health).options(handlers::health),
        )
        .layer(Extension(hasura));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
