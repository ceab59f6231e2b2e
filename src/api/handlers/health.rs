use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::api::AppState;
use crate::GIT_COMMIT_HASH;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    recordings: String,
    active_sessions: usize,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Recording storage is writable", body = Health),
        (status = 503, description = "Recording storage is missing", body = Health)
    ),
    tag = "health"
)]
// axum handler for health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let storage_ok = tokio::fs::metadata(state.recorder.storage_dir())
        .await
        .is_ok_and(|meta| meta.is_dir());

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        recordings: if storage_ok { "ok" } else { "error" }.to_string(),
        active_sessions: state.recorder.active_sessions().len(),
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .unwrap_or_else(|err| {
            error!("Failed to parse X-App header: {}", err);
            HeaderMap::new()
        });

    if storage_ok {
        (StatusCode::OK, headers, Json(health))
    } else {
        debug!("Recording storage directory is unavailable");
        (StatusCode::SERVICE_UNAVAILABLE, headers, Json(health))
    }
}
