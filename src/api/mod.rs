//! HTTP surface: router, middleware, and the serve loop.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderName, HeaderValue, Method, Request},
    routing::get,
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
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

use crate::auth::{
    AuthService, MemorySessionStore, PgSessionStore, SessionStore, DEFAULT_SESSION_TTL_SECONDS,
};
use crate::users::{MemoryRepository, PgUserRepository, UserRepository};

pub mod handlers;
pub mod oauth;
// OpenAPI router wiring and route registration live in openapi.rs.
pub mod openapi;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Knobs for the HTTP layer; everything else lives in the service object.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    session_ttl_seconds: i64,
    session_cookie_secure: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            session_cookie_secure: false,
        }
    }
}

impl ApiConfig {
    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_cookie_secure(mut self, secure: bool) -> Self {
        self.session_cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.session_cookie_secure
    }
}

/// Shared state handed to every handler.
pub struct AppState {
    pub auth: AuthService,
    pub config: ApiConfig,
    /// Absent when no provider credentials were configured; the federated
    /// routes answer 503 in that case.
    pub oauth: Option<oauth::OAuthClient>,
}

impl AppState {
    #[must_use]
    pub fn new(auth: AuthService, config: ApiConfig, oauth: Option<oauth::OAuthClient>) -> Self {
        Self {
            auth,
            config,
            oauth,
        }
    }
}

/// Build the application router over the given state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any);

    // The documented routes come from the OpenAPI wiring so the served
    // surface and the generated document cannot drift apart.
    let (router, _openapi) = openapi::api_router().split_for_parts();
    router
        .route("/openapi.json", get(openapi::openapi_json))
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
                .layer(Extension(state)),
        )
}

/// Connect storage per the DSN and serve until the process is stopped.
///
/// An empty DSN selects the in-memory repository and session store, which
/// is only suitable for development.
///
/// # Errors
/// Returns an error if the database or listener cannot be set up.
pub async fn serve(port: u16, dsn: &str, config: ApiConfig, oauth: Option<oauth::OAuthClient>) -> Result<()> {
    let (repository, sessions): (Arc<dyn UserRepository>, Arc<dyn SessionStore>) = if dsn.is_empty()
    {
        info!("no DSN configured, using in-memory storage");
        (
            Arc::new(MemoryRepository::new()),
            Arc::new(MemorySessionStore::new(Duration::from_secs(
                u64::try_from(config.session_ttl_seconds()).unwrap_or(0),
            ))),
        )
    } else {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;
        (
            Arc::new(PgUserRepository::new(pool.clone())),
            Arc::new(PgSessionStore::new(pool, config.session_ttl_seconds())),
        )
    };

    let auth = AuthService::new(repository, sessions);
    let state = Arc::new(AppState::new(auth, config, oauth));
    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, ?headers, request_id)
}
