//! Command-line argument dispatch.
//!
//! Maps validated CLI arguments to the action the binary runs, which today is
//! always starting the API server.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::auth;
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches.get_one::<String>("dsn").cloned();

    let server_secret = matches
        .get_one::<String>(auth::ARG_SERVER_SECRET)
        .map(|secret| SecretString::from(secret.as_str()))
        .context("missing required argument: --server-secret")?;

    let access_token_ttl = matches
        .get_one::<Duration>(auth::ARG_ACCESS_TOKEN_TTL)
        .copied()
        .context("missing required argument: --access-token-ttl")?;
    let refresh_token_ttl = matches
        .get_one::<Duration>(auth::ARG_REFRESH_TOKEN_TTL)
        .copied()
        .context("missing required argument: --refresh-token-ttl")?;
    if refresh_token_ttl < access_token_ttl {
        anyhow::bail!("--refresh-token-ttl must not be shorter than --access-token-ttl");
    }

    let frontend_base_url = matches
        .get_one::<String>(auth::ARG_FRONTEND_BASE_URL)
        .cloned()
        .context("missing required argument: --frontend-base-url")?;

    Ok(Action::Server(Args {
        port,
        dsn,
        server_secret,
        access_token_ttl,
        refresh_token_ttl,
        frontend_base_url,
    }))
}
