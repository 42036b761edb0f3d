//! Command-line argument dispatch.
//!
//! Parses validated CLI arguments and maps them to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{recaptcha, session, view};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let session_opts = session::Options::parse(matches)?;
    let recaptcha_opts = recaptcha::Options::parse(matches)?;
    let view_opts = view::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        session_key: session_opts.key,
        session_name: session_opts.name,
        session_max_age_seconds: session_opts.max_age_seconds,
        recaptcha_enabled: recaptcha_opts.enabled,
        recaptcha_secret: recaptcha_opts.secret,
        recaptcha_site_key: recaptcha_opts.site_key,
        template_root: view_opts.template_root,
        static_root: view_opts.static_root,
        base_uri: view_opts.base_uri,
    }))
}
