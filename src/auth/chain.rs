use axum::http::HeaderMap;
use std::sync::Arc;

use super::touch::TouchQueue;
use super::validators::{ApiKeyValidator, BearerValidator, CredentialValidator, SessionValidator};
use super::{AuthFailure, Identity};
use crate::store::CredentialStore;

/// Priority-ordered list of credential validators.
///
/// Schemes whose credential is absent are skipped. A presented credential that
/// fails falls through to the next scheme; the first success wins.
pub struct AuthChain {
    validators: Vec<Arc<dyn CredentialValidator>>,
}

impl AuthChain {
    /// Standard chain: API key, then session token, then bearer.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, touch: TouchQueue) -> Self {
        Self::empty()
            .with_validator(Arc::new(ApiKeyValidator::new(store.clone(), touch.clone())))
            .with_validator(Arc::new(SessionValidator::new(store, touch)))
            .with_validator(Arc::new(BearerValidator))
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// Append a validator at the lowest priority.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn CredentialValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    /// Resolve the caller, or report every scheme that was tried and why it failed.
    ///
    /// # Errors
    /// Returns `AuthFailure` when no validator accepted the request.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Identity, AuthFailure> {
        let mut failure = AuthFailure::default();

        for validator in &self.validators {
            let Some(credential) = validator.extract(headers) else {
                continue;
            };
            match validator.validate(&credential).await {
                Ok(identity) => return Ok(identity),
                Err(err) => failure.record(validator.method(), err),
            }
        }

        Err(failure)
    }
}
