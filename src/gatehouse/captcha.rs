//! Google reCAPTCHA server-side verification.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use super::Config;
use crate::APP_USER_AGENT;

const SITEVERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("captcha verification request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// Site key rendered into forms, `None` when the challenge is disabled.
    fn site_key(&self) -> Option<&str>;

    /// # Errors
    /// Returns an error when the verification service cannot be reached.
    async fn verify(
        &self,
        response: Option<&str>,
        remote_ip: Option<&str>,
    ) -> Result<bool, CaptchaError>;
}

#[derive(Deserialize, Debug)]
struct SiteVerify {
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

pub struct Recaptcha {
    client: Client,
    enabled: bool,
    secret: SecretString,
    site_key: String,
    verify_url: String,
}

impl Recaptcha {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, CaptchaError> {
        let client = Client::builder().user_agent(APP_USER_AGENT).build()?;

        Ok(Self {
            client,
            enabled: config.recaptcha_enabled(),
            secret: config.recaptcha_secret().clone(),
            site_key: config.recaptcha_site_key().to_string(),
            verify_url: SITEVERIFY_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_verify_url(mut self, url: String) -> Self {
        self.verify_url = url;
        self
    }
}

#[async_trait]
impl CaptchaVerifier for Recaptcha {
    fn site_key(&self) -> Option<&str> {
        self.enabled.then_some(self.site_key.as_str())
    }

    #[instrument(skip(self, response))]
    async fn verify(
        &self,
        response: Option<&str>,
        remote_ip: Option<&str>,
    ) -> Result<bool, CaptchaError> {
        if !self.enabled {
            return Ok(true);
        }

        let Some(response) = response.filter(|r| !r.is_empty()) else {
            return Ok(false);
        };

        let mut params = vec![
            ("secret", self.secret.expose_secret()),
            ("response", response),
        ];
        if let Some(ip) = remote_ip {
            params.push(("remoteip", ip));
        }

        let result: SiteVerify = self
            .client
            .post(&self.verify_url)
            .form(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !result.success {
            debug!("reCAPTCHA rejected: {:?}", result.error_codes);
        }

        Ok(result.success)
    }
}
