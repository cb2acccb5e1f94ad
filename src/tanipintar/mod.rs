#[allow(unused_imports)]
use crate::{
    auth::{AuthGuard, PgUserDirectory, RotationProtocol},
    cli::globals::GlobalArgs,
    store::RedisStore,
    tanipintar::handlers::{
        health, health::__path_health, login, login::__path_login, logout, logout::__path_logout,
        refresh, refresh::__path_refresh, session, session::__path_session,
    },
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request},
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;

#[derive(OpenApi)]
#[openapi(
    paths(health, login, refresh, logout, session),
    components(
        schemas(
            handlers::health::Health,
            handlers::login::LoginRequest,
            handlers::refresh::RefreshRequest,
            handlers::logout::LogoutResponse,
            handlers::ErrorBody,
            handlers::TokenPairBody,
            handlers::UserBody,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Access/refresh token pair issuance and rotation"),
        (name = "health", description = "Service health"),
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

/// Start the auth service.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the database or revocation
/// store cannot be reached, or the server fails to start.
pub async fn new(port: u16, dsn: String, redis_url: String, globals: &GlobalArgs) -> Result<()> {
    // Invalid secrets or TTLs must abort startup, before any socket binds.
    let codec = globals.codec().context("Invalid token configuration")?;

    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .acquire_timeout(Duration::from_secs(5))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(
        RedisStore::connect(&redis_url)
            .await
            .context("Failed to connect to revocation store")?,
    );
    let directory = Arc::new(PgUserDirectory::new(pool.clone()));

    let protocol = Arc::new(RotationProtocol::new(
        codec.clone(),
        store.clone(),
        directory,
    ));
    let guard = Arc::new(AuthGuard::new(codec, store).with_fail_open(globals.store_fail_open));

    let cors = CorsLayer::new()
        // allow `GET` and `POST` when accessing the resource
        .allow_methods([Method::GET, Method::POST])
        // allow requests from any origin
        .allow_origin(Any);

    let app = Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh-token", post(handlers::refresh))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/session", get(handlers::session))
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
                .layer(Extension(protocol))
                .layer(Extension(guard)),
        )
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route(
            "/health",
            get(handlers::health).options(handlers::health),
        );

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

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, ?headers, request_id)
}
