//! HTTP control plane.
//!
//! Public health probe plus authenticated routes. Every `/v1` route runs behind
//! the auth chain; recording routes additionally require an admin identity.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::get,
    Router,
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;

use crate::auth::{
    middleware::{admin_only, authenticate},
    touch::{spawn_touch_worker, DEFAULT_TOUCH_QUEUE_SIZE},
    AuthChain, AuthMethod, Identity,
};
use crate::recording::SessionRecorder;
use crate::store::PgCredentialStore;

pub mod handlers;

use handlers::{health, me, recordings};

pub const DEFAULT_RECORDINGS_DIR: &str = "/var/lib/warden/recordings";

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<AuthChain>,
    pub recorder: Arc<SessionRecorder>,
}

/// Server settings resolved from the CLI.
#[derive(Clone, Debug)]
pub struct Config {
    port: u16,
    dsn: SecretString,
    recordings_dir: PathBuf,
    touch_queue_size: usize,
}

impl Config {
    #[must_use]
    pub fn new(dsn: SecretString) -> Self {
        Self {
            port: 8080,
            dsn,
            recordings_dir: PathBuf::from(DEFAULT_RECORDINGS_DIR),
            touch_queue_size: DEFAULT_TOUCH_QUEUE_SIZE,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_recordings_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.recordings_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_touch_queue_size(mut self, size: usize) -> Self {
        self.touch_queue_size = size;
        self
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn recordings_dir(&self) -> &Path {
        &self.recordings_dir
    }

    #[must_use]
    pub fn touch_queue_size(&self) -> usize {
        self.touch_queue_size
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health::health, me::me, recordings::list, recordings::fetch),
    components(schemas(health::Health, Identity, AuthMethod, recordings::RecordingsResponse)),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Caller identity"),
        (name = "recordings", description = "Session recordings (admin)")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Build the router with auth, request-id and trace layers applied.
pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/v1/recordings", get(recordings::list))
        .route("/v1/recordings/:session_id", get(recordings::fetch))
        .route_layer(middleware::from_fn(admin_only));

    // route_layer wraps the admin routes too, so authentication runs first.
    let authenticated = Router::new()
        .route("/v1/me", get(me::me))
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(
            state.chain.clone(),
            authenticate,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(authenticated)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span)),
        )
        .with_state(state)
}

/// Connect the credential store, start background workers and serve until
/// SIGINT/SIGTERM.
///
/// # Errors
/// Returns an error if the database is unreachable, the recordings directory
/// cannot be created, or the listener fails.
pub async fn new(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(config.dsn.expose_secret())
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(PgCredentialStore::new(pool));

    // Last-used bookkeeping runs detached from requests.
    let (touch, _touch_worker) = spawn_touch_worker(store.clone(), config.touch_queue_size());

    let recorder = SessionRecorder::new(config.recordings_dir()).with_context(|| {
        format!(
            "Failed to prepare recordings directory: {}",
            config.recordings_dir().display()
        )
    })?;

    let state = AppState {
        chain: Arc::new(AuthChain::new(store, touch)),
        recorder: Arc::new(recorder),
    };

    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{}", config.port())).await?;

    info!("Listening on [::]:{}", config.port());

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Gracefully shutdown");

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

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
