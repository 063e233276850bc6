use clap::{Arg, ArgMatches, Command};

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";

#[derive(Debug, Clone)]
pub struct Options {
    pub base_url: String,
}

impl Options {
    /// Parse frontend arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the base URL is empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let base_url = match matches.get_one::<String>(ARG_FRONTEND_BASE_URL) {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => anyhow::bail!("missing required argument: --{ARG_FRONTEND_BASE_URL}"),
        };
        Ok(Self { base_url })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_FRONTEND_BASE_URL)
            .long(ARG_FRONTEND_BASE_URL)
            .help("Site base URL allowed as CORS origin")
            .env("DELETION_CENTER_FRONTEND_BASE_URL")
            .default_value("https://pocketpanel.ai"),
    )
}
