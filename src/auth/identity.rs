//! Resolved caller identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Credential scheme that produced an [`Identity`].
///
/// Variant order is the order the chain tries them in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    ApiKey,
    Session,
    Bearer,
}

impl AuthMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ApiKey => "api_key",
            Self::Session => "session",
            Self::Bearer => "bearer",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated caller for the lifetime of one request.
///
/// Built by the auth chain and stored in request extensions; never persisted.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, ToSchema)]
pub struct Identity {
    #[schema(value_type = String)]
    pub user_id: Uuid,
    pub username: String,
    pub is_admin: bool,
    pub auth_method: AuthMethod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_method_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(AuthMethod::ApiKey).ok(),
            Some(serde_json::json!("api_key"))
        );
        assert_eq!(AuthMethod::Session.to_string(), "session");
        assert_eq!(AuthMethod::Bearer.as_str(), "bearer");
    }
}
