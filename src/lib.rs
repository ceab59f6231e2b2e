//! # Warden (gateway trust gate & session audit trail)
//!
//! `warden` sits in front of interactive sessions (SSH and friends) and owns two
//! things: deciding who the caller is, and keeping a sanitized copy of what the
//! session printed.
//!
//! ## Authentication
//!
//! Credentials are tried in a fixed order: API key (`X-API-Key`), session token
//! (`X-Session-Token` or the `session_token` cookie), then bearer token. The first
//! scheme that validates wins. Raw secrets are hashed before they reach the
//! credential store and are never logged. The bearer scheme fails closed until a
//! verification algorithm exists.
//!
//! ## Recording
//!
//! Each live session gets one plain-text artifact under the recordings directory.
//! ANSI escape sequences are stripped before bytes hit disk, and the artifact is
//! bracketed by a header and footer carrying the session id and timestamps.

pub mod api;
pub mod auth;
pub mod cli;
pub mod recording;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }
}
