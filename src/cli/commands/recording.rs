use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

use crate::api::DEFAULT_RECORDINGS_DIR;

pub const ARG_RECORDINGS_DIR: &str = "recordings-dir";
pub const ARG_TOUCH_QUEUE_SIZE: &str = "touch-queue-size";

#[derive(Debug, Clone)]
pub struct Options {
    pub recordings_dir: PathBuf,
    pub touch_queue_size: usize,
}

impl Options {
    /// Parse recording and bookkeeping arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the recordings directory is blank or the queue size is zero.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let recordings_dir = matches
            .get_one::<String>(ARG_RECORDINGS_DIR)
            .map(|dir| dir.trim().to_string())
            .filter(|dir| !dir.is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_RECORDINGS_DIR}"))?;

        let touch_queue_size = matches
            .get_one::<usize>(ARG_TOUCH_QUEUE_SIZE)
            .copied()
            .unwrap_or(crate::auth::touch::DEFAULT_TOUCH_QUEUE_SIZE);
        if touch_queue_size == 0 {
            anyhow::bail!("--{ARG_TOUCH_QUEUE_SIZE} must be greater than zero");
        }

        Ok(Self {
            recordings_dir: PathBuf::from(recordings_dir),
            touch_queue_size,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_RECORDINGS_DIR)
                .long(ARG_RECORDINGS_DIR)
                .help("Directory session recordings are written to (created with mode 0700)")
                .env("WARDEN_RECORDINGS_DIR")
                .default_value(DEFAULT_RECORDINGS_DIR),
        )
        .arg(
            Arg::new(ARG_TOUCH_QUEUE_SIZE)
                .long(ARG_TOUCH_QUEUE_SIZE)
                .help("Pending last-used updates kept before new ones are dropped")
                .env("WARDEN_TOUCH_QUEUE_SIZE")
                .default_value("1024")
                .value_parser(clap::value_parser!(usize)),
        )
}
