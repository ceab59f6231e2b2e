use clap::{builder::ValueParser, Arg, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accepts `WARDEN_LOG_LEVEL` as a level name or its index in [`LEVELS`].
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(|level: &str| -> Result<u8, String> {
        let level = level.trim().to_ascii_lowercase();
        let index = match level.parse::<u8>() {
            Ok(index) => usize::from(index),
            Err(_) => LEVELS.iter().position(|name| *name == level).unwrap_or(usize::MAX),
        };
        u8::try_from(index)
            .ok()
            .filter(|index| usize::from(*index) < LEVELS.len())
            .ok_or_else(|| format!("log level must be one of {} or 0-4", LEVELS.join(", ")))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log verbosity for auth audits and recording events; repeat -v or set WARDEN_LOG_LEVEL (default: error)")
            .env("WARDEN_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
