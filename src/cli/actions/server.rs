use crate::gatehouse::{self, redact_dsn, Config};
use anyhow::{Context, Result};
use secrecy::SecretString;
use tracing::info;
use url::Url;

pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub session_key: SecretString,
    pub session_name: String,
    pub session_max_age_seconds: i64,
    pub recaptcha_enabled: bool,
    pub recaptcha_secret: SecretString,
    pub recaptcha_site_key: String,
    pub template_root: String,
    pub static_root: String,
    pub base_uri: String,
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("port", &self.port)
            .field("dsn", &redact_dsn(&self.dsn))
            .field("session_key", &self.session_key)
            .field("session_name", &self.session_name)
            .field("session_max_age_seconds", &self.session_max_age_seconds)
            .field("recaptcha_enabled", &self.recaptcha_enabled)
            .field("recaptcha_secret", &self.recaptcha_secret)
            .field("recaptcha_site_key", &self.recaptcha_site_key)
            .field("template_root", &self.template_root)
            .field("static_root", &self.static_root)
            .field("base_uri", &self.base_uri)
            .finish()
    }
}

impl Args {
    /// Build the immutable application configuration.
    ///
    /// # Errors
    /// Returns an error if the DSN is not a valid URL.
    pub fn into_config(self) -> Result<Config> {
        let dsn = Url::parse(&self.dsn).context("Invalid database connection string")?;

        Ok(Config::new(dsn.to_string(), self.session_key)
            .with_port(self.port)
            .with_session_name(self.session_name)
            .with_session_max_age_seconds(self.session_max_age_seconds)
            .with_recaptcha(
                self.recaptcha_enabled,
                self.recaptcha_secret,
                self.recaptcha_site_key,
            )
            .with_template_root(self.template_root)
            .with_static_root(self.static_root)
            .with_base_uri(self.base_uri))
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = args.into_config()?;

    log_startup_config(&config);

    gatehouse::new(config).await
}

fn log_startup_config(config: &Config) {
    let entries = [
        ("listen", format!("tcp:{}", config.port())),
        ("dsn", redact_dsn(config.dsn())),
        ("session_name", config.session_name().to_string()),
        (
            "session_max_age_seconds",
            config.session_max_age_seconds().to_string(),
        ),
        ("recaptcha_enabled", config.recaptcha_enabled().to_string()),
        ("template_root", config.template_root().to_string()),
        ("static_root", config.static_root().to_string()),
        ("base_uri", config.base_uri().to_string()),
    ];
    info!("{}", format_entries("Startup configuration", &entries));
}

fn format_entries(title: &str, entries: &[(&str, String)]) -> String {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\n{title}:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    message
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}
