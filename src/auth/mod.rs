//! Request authentication.
//!
//! Flow Overview:
//! 1) Each validator pulls its own credential out of the request headers.
//! 2) The presented secret is hashed and looked up through [`CredentialStore`].
//! 3) Revocation and expiry are checked, then the owning user is resolved.
//! 4) The first validator that succeeds yields the request's [`Identity`].
//!
//! [`CredentialStore`]: crate::store::CredentialStore

mod chain;
mod error;
mod hash;
mod identity;
pub mod middleware;
pub mod touch;
pub mod validators;

pub use chain::AuthChain;
pub use error::{AuthError, AuthFailure};
pub use hash::hash_credential;
pub use identity::{AuthMethod, Identity};

/// Caller is authenticated but lacks the admin flag (or is not authenticated at all).
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("admin privileges required")]
pub struct Forbidden;

/// Admin gate. Passes only an identity that exists and has `is_admin` set.
///
/// # Errors
/// Returns `Forbidden` for a missing identity or a non-admin user.
pub fn require_admin(identity: Option<&Identity>) -> Result<&Identity, Forbidden> {
    match identity {
        Some(identity) if identity.is_admin => Ok(identity),
        _ => Err(Forbidden),
    }
}
