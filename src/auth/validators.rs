//! Credential validators, one per scheme.
//!
//! Each validator knows where its credential lives in the request and how to
//! turn it into an [`Identity`]. The chain tries them in registration order.

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use chrono::Utc;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::hash::hash_secret;
use super::touch::{Touch, TouchQueue};
use super::{AuthError, AuthMethod, Identity};
use crate::store::{CredentialStore, UserRecord};

pub const API_KEY_HEADER: &str = "x-api-key";
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";
pub const SESSION_COOKIE_NAME: &str = "session_token";

#[async_trait]
pub trait CredentialValidator: Send + Sync {
    fn method(&self) -> AuthMethod;

    /// Pull this scheme's credential out of the request, if it was presented.
    fn extract(&self, headers: &HeaderMap) -> Option<SecretString>;

    async fn validate(&self, credential: &SecretString) -> Result<Identity, AuthError>;
}

/// `X-API-Key` header.
pub struct ApiKeyValidator {
    store: Arc<dyn CredentialStore>,
    touch: TouchQueue,
}

impl ApiKeyValidator {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, touch: TouchQueue) -> Self {
        Self { store, touch }
    }
}

#[async_trait]
impl CredentialValidator for ApiKeyValidator {
    fn method(&self) -> AuthMethod {
        AuthMethod::ApiKey
    }

    fn extract(&self, headers: &HeaderMap) -> Option<SecretString> {
        header_value(headers, API_KEY_HEADER)
    }

    async fn validate(&self, credential: &SecretString) -> Result<Identity, AuthError> {
        let key_hash = hash_secret(credential);
        let key = match self.store.api_key_by_hash(&key_hash).await {
            Ok(Some(key)) => key,
            Ok(None) => return Err(AuthError::InvalidCredential),
            Err(err) => {
                error!("Failed to lookup API key: {err}");
                return Err(AuthError::InvalidCredential);
            }
        };

        // Revocation wins even when the key has not expired yet.
        if key.revoked_at.is_some() {
            return Err(AuthError::Revoked);
        }
        if key.expires_at.is_some_and(|expires_at| Utc::now() > expires_at) {
            return Err(AuthError::Expired);
        }

        let user = resolve_user(self.store.as_ref(), key.user_id).await?;

        self.touch.submit(Touch::ApiKey {
            id: key.id,
            at: Utc::now(),
        });

        debug!(user = %user.username, key = %key.name, "API key authenticated");
        Ok(identity(user, AuthMethod::ApiKey))
    }
}

/// `X-Session-Token` header, or the `session_token` cookie when the header is absent.
pub struct SessionValidator {
    store: Arc<dyn CredentialStore>,
    touch: TouchQueue,
}

impl SessionValidator {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, touch: TouchQueue) -> Self {
        Self { store, touch }
    }
}

#[async_trait]
impl CredentialValidator for SessionValidator {
    fn method(&self) -> AuthMethod {
        AuthMethod::Session
    }

    fn extract(&self, headers: &HeaderMap) -> Option<SecretString> {
        header_value(headers, SESSION_TOKEN_HEADER)
            .or_else(|| cookie_value(headers, SESSION_COOKIE_NAME))
    }

    async fn validate(&self, credential: &SecretString) -> Result<Identity, AuthError> {
        let token_hash = hash_secret(credential);
        let session = match self.store.session_by_hash(&token_hash).await {
            Ok(Some(session)) => session,
            Ok(None) => return Err(AuthError::InvalidCredential),
            Err(err) => {
                error!("Failed to lookup session: {err}");
                return Err(AuthError::InvalidCredential);
            }
        };

        if Utc::now() > session.expires_at {
            if let Err(err) = self.store.delete_session(session.id).await {
                error!(session = %session.id, "Failed to delete expired session: {err}");
            }
            return Err(AuthError::Expired);
        }

        let user = resolve_user(self.store.as_ref(), session.user_id).await?;

        self.touch.submit(Touch::Session {
            id: session.id,
            at: Utc::now(),
        });

        debug!(user = %user.username, "Session authenticated");
        Ok(identity(user, AuthMethod::Session))
    }
}

/// `Authorization: Bearer <token>`.
///
/// There is no token verification scheme yet, so every presented bearer token
/// is rejected.
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerValidator;

#[async_trait]
impl CredentialValidator for BearerValidator {
    fn method(&self) -> AuthMethod {
        AuthMethod::Bearer
    }

    fn extract(&self, headers: &HeaderMap) -> Option<SecretString> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let token = value.strip_prefix("Bearer ")?.trim();
        if token.is_empty() {
            None
        } else {
            Some(SecretString::from(token.to_string()))
        }
    }

    async fn validate(&self, _credential: &SecretString) -> Result<Identity, AuthError> {
        Err(AuthError::Unsupported)
    }
}

async fn resolve_user(store: &dyn CredentialStore, user_id: Uuid) -> Result<UserRecord, AuthError> {
    match store.user_by_id(user_id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            warn!(user_id = %user_id, "credential references a missing user");
            Err(AuthError::UserNotFound)
        }
        Err(err) => {
            error!(user_id = %user_id, "Failed to lookup user: {err}");
            Err(AuthError::UserNotFound)
        }
    }
}

fn identity(user: UserRecord, auth_method: AuthMethod) -> Identity {
    Identity {
        user_id: user.id,
        username: user.username,
        is_admin: user.is_admin,
        auth_method,
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<SecretString> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(SecretString::from(value.to_string()))
    }
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<SecretString> {
    for header in headers.get_all(header::COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let key = parts.next().map(str::trim);
            let val = parts.next().map(str::trim);
            if let (Some(key), Some(val)) = (key, val) {
                if key == name && !val.is_empty() {
                    return Some(SecretString::from(val.to_string()));
                }
            }
        }
    }
    None
}
