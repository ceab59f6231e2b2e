//! Credential persistence contract.
//!
//! The auth chain never talks to a database directly. It goes through
//! [`CredentialStore`], which only ever sees content hashes of secrets.
//! Lookups return `Ok(None)` for "no such record" so callers can tell a miss
//! apart from a backend failure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Failure talking to the credential backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("credential store query failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Stored API key. `key_hash` is the hex SHA-256 of the raw key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub name: String,
    pub key_hash: String,
    pub user_id: Uuid,
    pub revoked_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Stored HTTP session. `token_hash` is the hex SHA-256 of the raw token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub id: Uuid,
    pub token_hash: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub is_admin: bool,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKeyRecord>, StoreError>;

    async fn touch_api_key(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn session_by_hash(&self, token_hash: &str)
        -> Result<Option<SessionRecord>, StoreError>;

    async fn touch_session(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Deleting a session that no longer exists is not an error.
    async fn delete_session(&self, id: Uuid) -> Result<(), StoreError>;

    async fn user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError>;
}
