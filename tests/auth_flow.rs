use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;
use warden::{
    api::{router, AppState},
    auth::{hash_credential, touch::spawn_touch_worker, AuthChain},
    recording::SessionRecorder,
    store::{ApiKeyRecord, MemoryCredentialStore, SessionRecord, UserRecord},
};

const USER_KEY: &str = "wk_user_key";
const ADMIN_KEY: &str = "wk_admin_key";
const USER_SESSION: &str = "user-session-token";

struct Harness {
    app: Router,
    recorder: Arc<SessionRecorder>,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryCredentialStore::new());

    let user = UserRecord {
        id: Uuid::new_v4(),
        username: "alice".to_string(),
        is_admin: false,
    };
    let admin = UserRecord {
        id: Uuid::new_v4(),
        username: "root".to_string(),
        is_admin: true,
    };
    store.insert_user(user.clone());
    store.insert_user(admin.clone());

    for (raw, owner) in [(USER_KEY, &user), (ADMIN_KEY, &admin)] {
        store.insert_api_key(ApiKeyRecord {
            id: Uuid::new_v4(),
            name: format!("{}-key", owner.username),
            key_hash: hash_credential(raw),
            user_id: owner.id,
            revoked_at: None,
            expires_at: None,
            last_used_at: None,
        });
    }
    store.insert_session(SessionRecord {
        id: Uuid::new_v4(),
        token_hash: hash_credential(USER_SESSION),
        user_id: user.id,
        expires_at: Utc::now() + Duration::hours(8),
        last_seen_at: None,
    });

    let dir = tempfile::tempdir().expect("tempdir");
    let recorder = Arc::new(SessionRecorder::new(dir.path().join("recordings")).expect("recorder"));
    let (touch, _worker) = spawn_touch_worker(store.clone(), 64);

    let state = AppState {
        chain: Arc::new(AuthChain::new(store, touch)),
        recorder: recorder.clone(),
    };

    Harness {
        app: router(state),
        recorder,
        _dir: dir,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, headers, body.to_vec())
}

fn get(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(uri)
}

fn json_body(body: &[u8]) -> Value {
    serde_json::from_slice(body).expect("json body")
}

#[tokio::test]
async fn health_is_public_and_tagged() {
    let h = harness();
    let (status, headers, body) = send(&h.app, get("/health").body(Body::empty()).expect("request")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers.contains_key("x-app"));
    assert!(headers.contains_key("x-request-id"));
    let body = json_body(&body);
    assert_eq!(body["name"], "warden");
    assert_eq!(body["recordings"], "ok");
}

#[tokio::test]
async fn request_id_is_propagated() {
    let h = harness();
    let (_, headers, _) = send(
        &h.app,
        get("/health")
            .header("x-request-id", "req-123")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(
        headers.get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-123")
    );
}

#[tokio::test]
async fn missing_credentials_get_generic_401() {
    let h = harness();
    let (status, _, body) = send(&h.app, get("/v1/me").body(Body::empty()).expect("request")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(&body), json!({"error": "authentication required"}));
}

#[tokio::test]
async fn failure_reason_is_not_disclosed() {
    let h = harness();
    let (status, _, body) = send(
        &h.app,
        get("/v1/me")
            .header("x-api-key", "not-a-key")
            .header("authorization", "Bearer whatever")
            .body(Body::empty())
            .expect("request"),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(&body), json!({"error": "authentication required"}));
}

#[tokio::test]
async fn api_key_identity() {
    let h = harness();
    let (status, _, body) = send(
        &h.app,
        get("/v1/me")
            .header("x-api-key", USER_KEY)
            .body(Body::empty())
            .expect("request"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["is_admin"], false);
    assert_eq!(body["auth_method"], "api_key");
}

#[tokio::test]
async fn session_cookie_identity() {
    let h = harness();
    let (status, _, body) = send(
        &h.app,
        get("/v1/me")
            .header("cookie", format!("session_token={USER_SESSION}"))
            .body(Body::empty())
            .expect("request"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["auth_method"], "session");
}

#[tokio::test]
async fn recordings_require_admin() {
    let h = harness();

    let (status, _, body) = send(
        &h.app,
        get("/v1/recordings")
            .header("x-api-key", USER_KEY)
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json_body(&body), json!({"error": "admin privileges required"}));

    let (status, _, _) = send(
        &h.app,
        get("/v1/recordings").body(Body::empty()).expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_lists_active_recordings() {
    let h = harness();
    h.recorder.start_recording("ssh-42").expect("start");

    let (status, _, body) = send(
        &h.app,
        get("/v1/recordings")
            .header("x-api-key", ADMIN_KEY)
            .body(Body::empty())
            .expect("request"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["active_sessions"], json!(["ssh-42"]));
    assert_eq!(
        body["storage_dir"],
        h.recorder.storage_dir().display().to_string()
    );
}

#[tokio::test]
async fn admin_fetches_recording_artifact() {
    let h = harness();
    h.recorder.start_recording("ssh-7").expect("start");
    h.recorder
        .write("ssh-7", b"\x1b[32m$ uptime\x1b[0m\n")
        .expect("write");
    h.recorder.stop_recording("ssh-7").expect("stop");

    let (status, headers, body) = send(
        &h.app,
        get("/v1/recordings/ssh-7")
            .header("x-api-key", ADMIN_KEY)
            .body(Body::empty())
            .expect("request"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers.get("content-type").and_then(|v| v.to_str().ok()),
        Some("text/plain; charset=utf-8")
    );
    let text = String::from_utf8(body).expect("utf8");
    assert!(text.starts_with("# Warden Session Recording\n# Session ID: ssh-7\n"));
    assert!(text.contains("\n\n$ uptime\n\n# End Time: "));
}

#[tokio::test]
async fn unknown_or_invalid_recording_ids() {
    let h = harness();

    let (status, _, _) = send(
        &h.app,
        get("/v1/recordings/never-started")
            .header("x-api-key", ADMIN_KEY)
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(
        &h.app,
        get("/v1/recordings/..")
            .header("x-api-key", ADMIN_KEY)
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert!(status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND);

    let (status, _, _) = send(
        &h.app,
        get("/v1/recordings/a..b")
            .header("x-api-key", ADMIN_KEY)
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
