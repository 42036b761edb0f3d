use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_RECAPTCHA_ENABLED: &str = "recaptcha-enabled";
pub const ARG_RECAPTCHA_SECRET: &str = "recaptcha-secret";
pub const ARG_RECAPTCHA_SITE_KEY: &str = "recaptcha-site-key";

#[derive(Debug, Clone)]
pub struct Options {
    pub enabled: bool,
    pub secret: SecretString,
    pub site_key: String,
}

impl Options {
    /// Parse reCAPTCHA arguments from matches.
    ///
    /// # Errors
    /// Returns an error if reCAPTCHA is enabled without a secret or site key.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let enabled = matches.get_flag(ARG_RECAPTCHA_ENABLED);

        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let secret = get_non_empty(ARG_RECAPTCHA_SECRET);
        let site_key = get_non_empty(ARG_RECAPTCHA_SITE_KEY);

        if enabled && secret.is_none() {
            anyhow::bail!("missing required argument: --{ARG_RECAPTCHA_SECRET}");
        }

        if enabled && site_key.is_none() {
            anyhow::bail!("missing required argument: --{ARG_RECAPTCHA_SITE_KEY}");
        }

        Ok(Self {
            enabled,
            secret: SecretString::from(secret.unwrap_or_default()),
            site_key: site_key.unwrap_or_default(),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_RECAPTCHA_ENABLED)
                .long(ARG_RECAPTCHA_ENABLED)
                .help("Require a Google reCAPTCHA challenge on registration")
                .env("GATEHOUSE_RECAPTCHA_ENABLED")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_RECAPTCHA_SECRET)
                .long(ARG_RECAPTCHA_SECRET)
                .help("reCAPTCHA secret used for server-side verification")
                .env("GATEHOUSE_RECAPTCHA_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_RECAPTCHA_SITE_KEY)
                .long(ARG_RECAPTCHA_SITE_KEY)
                .help("reCAPTCHA site key rendered into the register form")
                .env("GATEHOUSE_RECAPTCHA_SITE_KEY"),
        )
}
