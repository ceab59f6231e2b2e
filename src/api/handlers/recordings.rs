//! Admin access to session recordings.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::ErrorKind;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::api::AppState;
use crate::recording::RecordingError;

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct RecordingsResponse {
    pub storage_dir: String,
    pub active_sessions: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/v1/recordings",
    responses(
        (status = 200, description = "Storage directory and sessions currently being recorded", body = RecordingsResponse),
        (status = 401, description = "No credential was accepted"),
        (status = 403, description = "Caller is not an admin"),
    ),
    tag = "recordings"
)]
pub async fn list(State(state): State<AppState>) -> Json<RecordingsResponse> {
    Json(RecordingsResponse {
        storage_dir: state.recorder.storage_dir().display().to_string(),
        active_sessions: state.recorder.active_sessions(),
    })
}

#[utoipa::path(
    get,
    path = "/v1/recordings/{session_id}",
    params(("session_id" = String, Path, description = "Session id the recording was started with")),
    responses(
        (status = 200, description = "Recording artifact", body = String, content_type = "text/plain"),
        (status = 400, description = "Session id cannot name an artifact"),
        (status = 401, description = "No credential was accepted"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No artifact for this session"),
    ),
    tag = "recordings"
)]
pub async fn fetch(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    let path = match state.recorder.recording_path(&session_id) {
        Ok(path) => path,
        Err(RecordingError::InvalidSessionId(_)) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "invalid session id"})),
            )
                .into_response();
        }
        Err(err) => {
            error!("Failed to resolve recording path: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match tokio::fs::read(&path).await {
        Ok(artifact) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            artifact,
        )
            .into_response(),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(session_id = %session_id, "recording not found");
            (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "recording not found"})),
            )
                .into_response()
        }
        Err(err) => {
            error!(session_id = %session_id, "Failed to read recording {}: {err}", path.display());
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
