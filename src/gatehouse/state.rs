//! Shared application state handed to every handler.

use anyhow::{Context, Result};
use std::sync::Arc;

use super::{
    captcha::CaptchaVerifier, passhash::Passhash, session::SessionManager, store::UserStore,
    view::Renderer, Config,
};

/// Plaintext hashed once at startup; verifying against it keeps an unknown
/// email as slow as a wrong password.
const DUMMY_PASSWORD: &str = "gatehouse-dummy-password";

pub struct AppState {
    config: Config,
    sessions: SessionManager,
    store: Arc<dyn UserStore>,
    passhash: Arc<dyn Passhash>,
    captcha: Arc<dyn CaptchaVerifier>,
    views: Arc<dyn Renderer>,
    dummy_hash: String,
}

impl AppState {
    /// # Errors
    /// Returns an error if the session key is unusable or the dummy hash cannot be computed.
    pub fn new(
        config: Config,
        store: Arc<dyn UserStore>,
        passhash: Arc<dyn Passhash>,
        captcha: Arc<dyn CaptchaVerifier>,
        views: Arc<dyn Renderer>,
    ) -> Result<Self> {
        let sessions = SessionManager::new(&config)?;
        let dummy_hash = passhash
            .hash(DUMMY_PASSWORD)
            .context("Failed to compute timing-equalization hash")?;

        Ok(Self {
            config,
            sessions,
            store,
            passhash,
            captcha,
            views,
            dummy_hash,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    #[must_use]
    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn passhash(&self) -> &dyn Passhash {
        self.passhash.as_ref()
    }

    #[must_use]
    pub fn captcha(&self) -> &dyn CaptchaVerifier {
        self.captcha.as_ref()
    }

    #[must_use]
    pub fn views(&self) -> &dyn Renderer {
        self.views.as_ref()
    }

    #[must_use]
    pub fn dummy_hash(&self) -> &str {
        &self.dummy_hash
    }
}
