//! Map parsed CLI arguments to the action the binary runs.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_PORT, frontend, upstream};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or empty.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let frontend_opts = frontend::Options::parse(matches)?;
    let upstream_opts = upstream::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        frontend_base_url: frontend_opts.base_url,
        delete_data_url: upstream_opts.delete_data_url,
        delete_account_url: upstream_opts.delete_account_url,
        upstream_timeout_seconds: upstream_opts.timeout_seconds,
    }))
}
