//! Process-wide settings, built once at startup and shared read-only.

use secrecy::SecretString;
use std::fmt;
use url::Url;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SESSION_NAME: &str = "gatehouse";
const DEFAULT_SESSION_MAX_AGE_SECONDS: i64 = 8 * 60 * 60;
const DEFAULT_TEMPLATE_ROOT: &str = "template";
const DEFAULT_STATIC_ROOT: &str = "static";

#[derive(Clone)]
pub struct Config {
    port: u16,
    dsn: String,
    session_key: SecretString,
    session_name: String,
    session_max_age_seconds: i64,
    recaptcha_enabled: bool,
    recaptcha_secret: SecretString,
    recaptcha_site_key: String,
    template_root: String,
    static_root: String,
    base_uri: String,
}

impl Config {
    #[must_use]
    pub fn new(dsn: String, session_key: SecretString) -> Self {
        Self {
            port: DEFAULT_PORT,
            dsn,
            session_key,
            session_name: DEFAULT_SESSION_NAME.to_string(),
            session_max_age_seconds: DEFAULT_SESSION_MAX_AGE_SECONDS,
            recaptcha_enabled: false,
            recaptcha_secret: SecretString::default(),
            recaptcha_site_key: String::new(),
            template_root: DEFAULT_TEMPLATE_ROOT.to_string(),
            static_root: DEFAULT_STATIC_ROOT.to_string(),
            base_uri: "/".to_string(),
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_session_name(mut self, name: String) -> Self {
        self.session_name = name;
        self
    }

    #[must_use]
    pub fn with_session_max_age_seconds(mut self, seconds: i64) -> Self {
        self.session_max_age_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_recaptcha(mut self, enabled: bool, secret: SecretString, site_key: String) -> Self {
        self.recaptcha_enabled = enabled;
        self.recaptcha_secret = secret;
        self.recaptcha_site_key = site_key;
        self
    }

    #[must_use]
    pub fn with_template_root(mut self, root: String) -> Self {
        self.template_root = root;
        self
    }

    #[must_use]
    pub fn with_static_root(mut self, root: String) -> Self {
        self.static_root = root;
        self
    }

    /// Normalized to always end with `/` so templates can append paths.
    #[must_use]
    pub fn with_base_uri(mut self, base_uri: String) -> Self {
        self.base_uri = if base_uri.ends_with('/') {
            base_uri
        } else {
            format!("{base_uri}/")
        };
        self
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    #[must_use]
    pub fn session_key(&self) -> &SecretString {
        &self.session_key
    }

    #[must_use]
    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    #[must_use]
    pub fn session_max_age_seconds(&self) -> i64 {
        self.session_max_age_seconds
    }

    #[must_use]
    pub fn recaptcha_enabled(&self) -> bool {
        self.recaptcha_enabled
    }

    #[must_use]
    pub fn recaptcha_secret(&self) -> &SecretString {
        &self.recaptcha_secret
    }

    #[must_use]
    pub fn recaptcha_site_key(&self) -> &str {
        &self.recaptcha_site_key
    }

    #[must_use]
    pub fn template_root(&self) -> &str {
        &self.template_root
    }

    #[must_use]
    pub fn static_root(&self) -> &str {
        &self.static_root
    }

    #[must_use]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
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

/// Replace the password of a connection string with `REDACTED`.
#[must_use]
pub fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}
