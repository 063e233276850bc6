use crate::api::handlers::deletion::{DEFAULT_DELETE_ACCOUNT_URL, DEFAULT_DELETE_DATA_URL};
use clap::{Arg, ArgMatches, Command};

pub const ARG_DELETE_DATA_URL: &str = "delete-data-url";
pub const ARG_DELETE_ACCOUNT_URL: &str = "delete-account-url";
pub const ARG_UPSTREAM_TIMEOUT_SECONDS: &str = "upstream-timeout-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub delete_data_url: String,
    pub delete_account_url: String,
    pub timeout_seconds: u64,
}

impl Options {
    /// Parse upstream function arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a URL is empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let non_empty = |id: &str| -> anyhow::Result<String> {
            match matches.get_one::<String>(id) {
                Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
                _ => anyhow::bail!("missing required argument: --{id}"),
            }
        };

        Ok(Self {
            delete_data_url: non_empty(ARG_DELETE_DATA_URL)?,
            delete_account_url: non_empty(ARG_DELETE_ACCOUNT_URL)?,
            timeout_seconds: matches
                .get_one::<u64>(ARG_UPSTREAM_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(30),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DELETE_DATA_URL)
                .long(ARG_DELETE_DATA_URL)
                .help("Upstream function that deletes a user's data")
                .env("DELETION_CENTER_DELETE_DATA_URL")
                .default_value(DEFAULT_DELETE_DATA_URL),
        )
        .arg(
            Arg::new(ARG_DELETE_ACCOUNT_URL)
                .long(ARG_DELETE_ACCOUNT_URL)
                .help("Upstream function that deletes a user's account and data")
                .env("DELETION_CENTER_DELETE_ACCOUNT_URL")
                .default_value(DEFAULT_DELETE_ACCOUNT_URL),
        )
        .arg(
            Arg::new(ARG_UPSTREAM_TIMEOUT_SECONDS)
                .long(ARG_UPSTREAM_TIMEOUT_SECONDS)
                .help("Timeout for upstream function calls in seconds")
                .env("DELETION_CENTER_UPSTREAM_TIMEOUT_SECONDS")
                .default_value("30")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
