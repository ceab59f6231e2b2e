use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

/// Hash a presented secret (API key or session token) for store lookups.
///
/// Returns lowercase hex so it matches the `key_hash`/`token_hash` columns.
/// The raw value never leaves this function.
pub(crate) fn hash_secret(secret: &SecretString) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.expose_secret().as_bytes());
    hex::encode(hasher.finalize())
}

/// Same digest for callers that still hold the raw string, e.g. provisioning
/// scripts and tests that seed a store.
#[must_use]
pub fn hash_credential(raw: &str) -> String {
    hash_secret(&SecretString::from(raw.to_string()))
}
