use std::fmt;

use super::AuthMethod;

/// Why a single scheme rejected its credential.
///
/// These stay server-side. Callers only ever see the generic 401.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credential")]
    InvalidCredential,
    #[error("credential expired")]
    Expired,
    #[error("credential revoked")]
    Revoked,
    #[error("owning user not found")]
    UserNotFound,
    #[error("authentication scheme not implemented")]
    Unsupported,
}

/// Every scheme the request presented, and how each one failed.
///
/// An empty attempt list means no credentials were presented at all.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AuthFailure {
    attempts: Vec<(AuthMethod, AuthError)>,
}

impl AuthFailure {
    pub(crate) fn record(&mut self, method: AuthMethod, error: AuthError) {
        self.attempts.push((method, error));
    }

    #[must_use]
    pub fn attempts(&self) -> &[(AuthMethod, AuthError)] {
        &self.attempts
    }

    #[must_use]
    pub fn no_credentials(&self) -> bool {
        self.attempts.is_empty()
    }
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attempts.is_empty() {
            return f.write_str("no credentials presented");
        }
        for (index, (method, error)) in self.attempts.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{method}: {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AuthFailure {}
