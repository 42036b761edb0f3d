use clap::{Arg, ArgMatches, Command};
use secrecy::{ExposeSecret, SecretString};

use crate::gatehouse::session::MAX_AGE_SECONDS;

pub const ARG_SESSION_KEY: &str = "session-key";
pub const ARG_SESSION_NAME: &str = "session-name";
pub const ARG_SESSION_MAX_AGE_SECONDS: &str = "session-max-age-seconds";

/// HMAC keys shorter than this are rejected.
pub const MIN_SESSION_KEY_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct Options {
    pub key: SecretString,
    pub name: String,
    pub max_age_seconds: i64,
}

impl Options {
    /// Parse session cookie arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the signing key is missing or too short.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let key = matches
            .get_one::<String>(ARG_SESSION_KEY)
            .cloned()
            .map(SecretString::from)
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_SESSION_KEY}"))?;

        if key.expose_secret().len() < MIN_SESSION_KEY_LEN {
            anyhow::bail!("--{ARG_SESSION_KEY} must be at least {MIN_SESSION_KEY_LEN} bytes");
        }

        let name = matches
            .get_one::<String>(ARG_SESSION_NAME)
            .cloned()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "gatehouse".to_string());

        let max_age_seconds = matches
            .get_one::<i64>(ARG_SESSION_MAX_AGE_SECONDS)
            .copied()
            .unwrap_or(28_800);

        Ok(Self {
            key,
            name,
            max_age_seconds,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_KEY)
                .long(ARG_SESSION_KEY)
                .help("Secret used to sign the session cookie (min 32 bytes)")
                .env("GATEHOUSE_SESSION_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_NAME)
                .long(ARG_SESSION_NAME)
                .help("Session cookie name")
                .env("GATEHOUSE_SESSION_NAME")
                .default_value("gatehouse"),
        )
        .arg(
            Arg::new(ARG_SESSION_MAX_AGE_SECONDS)
                .long(ARG_SESSION_MAX_AGE_SECONDS)
                .help("Session cookie lifetime in seconds (1 to 400 days)")
                .env("GATEHOUSE_SESSION_MAX_AGE_SECONDS")
                .default_value("28800")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_AGE_SECONDS)),
        )
}
