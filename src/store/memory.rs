//! In-process credential store for tests and local development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::{ApiKeyRecord, CredentialStore, SessionRecord, StoreError, UserRecord};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserRecord>,
    api_keys: HashMap<Uuid, ApiKeyRecord>,
    sessions: HashMap<Uuid, SessionRecord>,
}

/// Hash-map backed [`CredentialStore`].
///
/// `set_unavailable(true)` makes every call fail, which is how tests exercise
/// the "backend down" path of the auth chain.
#[derive(Default)]
pub struct MemoryCredentialStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: UserRecord) {
        self.write().users.insert(user.id, user);
    }

    pub fn insert_api_key(&self, key: ApiKeyRecord) {
        self.write().api_keys.insert(key.id, key);
    }

    pub fn insert_session(&self, session: SessionRecord) {
        self.write().sessions.insert(session.id, session);
    }

    #[must_use]
    pub fn api_key(&self, id: Uuid) -> Option<ApiKeyRecord> {
        self.read().api_keys.get(&id).cloned()
    }

    #[must_use]
    pub fn session(&self, id: Uuid) -> Option<SessionRecord> {
        self.read().sessions.get(&id).cloned()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store disabled".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn api_key_by_hash(&self, key_hash: &str) -> Result<Option<ApiKeyRecord>, StoreError> {
        self.check_available()?;
        Ok(self
            .read()
            .api_keys
            .values()
            .find(|key| key.key_hash == key_hash)
            .cloned())
    }

    async fn touch_api_key(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.check_available()?;
        if let Some(key) = self.write().api_keys.get_mut(&id) {
            key.last_used_at = Some(at);
        }
        Ok(())
    }

    async fn session_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<SessionRecord>, StoreError> {
        self.check_available()?;
        Ok(self
            .read()
            .sessions
            .values()
            .find(|session| session.token_hash == token_hash)
            .cloned())
    }

    async fn touch_session(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.check_available()?;
        if let Some(session) = self.write().sessions.get_mut(&id) {
            session.last_seen_at = Some(at);
        }
        Ok(())
    }

    async fn delete_session(&self, id: Uuid) -> Result<(), StoreError> {
        self.check_available()?;
        self.write().sessions.remove(&id);
        Ok(())
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        self.check_available()?;
        Ok(self.read().users.get(&id).cloned())
    }
}
