//! axum middleware around [`AuthChain`] and [`require_admin`].

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tracing::warn;

use super::{require_admin, AuthChain, Identity};

/// Resolve the caller and stash the [`Identity`] in request extensions.
///
/// Any failure ends the request with a bare 401. Which schemes were tried and
/// why they failed only goes to the audit log.
pub async fn authenticate(
    State(chain): State<Arc<AuthChain>>,
    mut request: Request,
    next: Next,
) -> Response {
    match chain.authenticate(request.headers()).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(failure) => {
            let peer = peer_address(&request);
            let forwarded_for = extract_client_ip(request.headers());
            let failures: Vec<String> = failure
                .attempts()
                .iter()
                .map(|(method, error)| format!("{method}: {error}"))
                .collect();
            warn!(
                http.method = %request.method(),
                http.path = request.uri().path(),
                peer = peer.as_deref().unwrap_or("unknown"),
                forwarded_for = forwarded_for.as_deref().unwrap_or("-"),
                ?failures,
                "authentication failed"
            );
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "authentication required"})),
            )
                .into_response()
        }
    }
}

/// Layer after [`authenticate`]; rejects non-admin callers with 403.
pub async fn admin_only(request: Request, next: Next) -> Response {
    let identity = request.extensions().get::<Identity>();
    if let Err(err) = require_admin(identity) {
        let user_id = identity.map(|i| i.user_id.to_string());
        warn!(
            user_id = user_id.as_deref().unwrap_or("anonymous"),
            http.path = request.uri().path(),
            "admin access denied"
        );
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": err.to_string()})),
        )
            .into_response();
    }
    next.run(request).await
}

fn peer_address(request: &Request) -> Option<String> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// Client IP as reported by a fronting proxy, if any.
///
/// The headers are caller-controlled unless a trusted proxy overwrites them,
/// so the audit log records the socket peer next to this value.
pub(crate) fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
