use crate::api;
use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub recordings_dir: PathBuf,
    pub touch_queue_size: usize,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the DSN is malformed or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let dsn = Url::parse(args.dsn.expose_secret()).context("Invalid DSN")?;
    if !matches!(dsn.scheme(), "postgres" | "postgresql") {
        return Err(anyhow!(
            "Unsupported DSN scheme '{}', expected postgres://",
            dsn.scheme()
        ));
    }

    debug!(
        host = dsn.host_str().unwrap_or("localhost"),
        database = dsn.path().trim_start_matches('/'),
        recordings_dir = %args.recordings_dir.display(),
        "Starting server"
    );

    let config = api::Config::new(args.dsn)
        .with_port(args.port)
        .with_recordings_dir(args.recordings_dir)
        .with_touch_queue_size(args.touch_queue_size);

    api::new(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(dsn: &str) -> Args {
        Args {
            port: 0,
            dsn: SecretString::from(dsn.to_string()),
            recordings_dir: PathBuf::from("/tmp/warden-test"),
            touch_queue_size: 1,
        }
    }

    #[tokio::test]
    async fn rejects_malformed_dsn() {
        assert!(execute(args("not a url")).await.is_err());
    }

    #[tokio::test]
    async fn rejects_non_postgres_dsn() {
        let err = execute(args("mysql://localhost/warden")).await.err();
        assert!(err.is_some_and(|e| e.to_string().contains("Unsupported DSN scheme")));
    }
}
