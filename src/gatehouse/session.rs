//! Typed per-visitor session carried in an HMAC-signed cookie.
//!
//! The cookie value is `base64url(json).base64url(hmac_sha256)`. The signed
//! JSON holds the session fields plus an absolute expiry, so a replayed cookie
//! stops working after `max_age` even if the browser keeps it.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::Config;

type HmacSha256 = Hmac<Sha256>;

/// Upper bound for the cookie lifetime; browsers cap `Max-Age` at 400 days.
pub const MAX_AGE_SECONDS: i64 = 400 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session signing key")]
    InvalidKey,
    #[error("session max age must be between 1 and {max} seconds, got {0}", max = MAX_AGE_SECONDS)]
    MaxAge(i64),
    #[error("malformed session cookie")]
    Malformed,
    #[error("invalid session signature")]
    Signature,
    #[error("session expired")]
    Expired,
    #[error("invalid session payload")]
    Json(#[from] serde_json::Error),
    #[error("invalid cookie header")]
    Header(#[from] InvalidHeaderValue),
}

/// Severity of a flash message; the serialized name doubles as the CSS class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Notice,
    Error,
    Warning,
    Success,
}

impl FlashLevel {
    #[must_use]
    pub fn as_class(self) -> &'static str {
        match self {
            Self::Notice => "alert-box",
            Self::Error => "alert-box alert",
            Self::Warning => "alert-box warning",
            Self::Success => "alert-box success",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub message: String,
    pub level: FlashLevel,
}

impl Flash {
    pub fn new(message: impl Into<String>, level: FlashLevel) -> Self {
        Self {
            message: message.into(),
            level,
        }
    }

    pub fn notice(message: impl Into<String>) -> Self {
        Self::new(message, FlashLevel::Notice)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, FlashLevel::Error)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, FlashLevel::Warning)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, FlashLevel::Success)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) first_name: Option<String>,
    #[serde(default)]
    pub(super) login_attempts: u32,
    #[serde(default)]
    pub(super) register_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) csrf_token: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(super) flashes: Vec<Flash>,
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    #[must_use]
    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    #[must_use]
    pub fn login_attempts(&self) -> u32 {
        self.login_attempts
    }

    #[must_use]
    pub fn register_attempts(&self) -> u32 {
        self.register_attempts
    }

    #[must_use]
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    pub(super) fn set_csrf_token(&mut self, token: String) {
        self.csrf_token = Some(token);
    }

    /// Record the authenticated identity.
    pub(super) fn authenticate(&mut self, user_id: Uuid, email: String, first_name: String) {
        self.user_id = Some(user_id);
        self.email = Some(email);
        self.first_name = Some(first_name);
    }

    /// Clear every field, including counters, token and pending flashes.
    pub fn empty(&mut self) {
        *self = Self::default();
    }

    pub fn add_flash(&mut self, flash: Flash) {
        self.flashes.push(flash);
    }

    /// Drain the pending flashes; each one is shown exactly once.
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.flashes)
    }
}

#[derive(Serialize, Deserialize)]
struct SignedPayload {
    exp: i64,
    session: Session,
}

/// Loads and stores [`Session`] values through the signed cookie.
#[derive(Clone)]
pub struct SessionManager {
    mac: HmacSha256,
    name: String,
    max_age_seconds: i64,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("mac", &"***")
            .field("name", &self.name)
            .field("max_age_seconds", &self.max_age_seconds)
            .finish()
    }
}

impl SessionManager {
    /// # Errors
    /// Returns an error if the key cannot initialize HMAC-SHA256 or the max age
    /// is outside `1..=MAX_AGE_SECONDS`.
    pub fn new(config: &Config) -> Result<Self, SessionError> {
        let mac = HmacSha256::new_from_slice(config.session_key().expose_secret().as_bytes())
            .map_err(|_| SessionError::InvalidKey)?;

        let max_age_seconds = config.session_max_age_seconds();
        if !(1..=MAX_AGE_SECONDS).contains(&max_age_seconds) {
            return Err(SessionError::MaxAge(max_age_seconds));
        }

        Ok(Self {
            mac,
            name: config.session_name().to_string(),
            max_age_seconds,
        })
    }

    /// Read the visitor's session. Missing, tampered or expired cookies yield
    /// a fresh empty session.
    #[must_use]
    pub fn load(&self, headers: &HeaderMap) -> Session {
        let Some(value) = self.extract_cookie(headers) else {
            return Session::default();
        };

        match self.decode(&value) {
            Ok(session) => session,
            Err(err) => {
                debug!("Discarding session cookie: {err}");
                Session::default()
            }
        }
    }

    /// Build the `Set-Cookie` header value persisting `session`.
    ///
    /// # Errors
    /// Returns an error if the session cannot be serialized.
    pub fn cookie(&self, session: &Session) -> Result<HeaderValue, SessionError> {
        let value = self.encode(session)?;
        let cookie = format!(
            "{}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.name, self.max_age_seconds
        );
        Ok(HeaderValue::from_str(&cookie)?)
    }

    fn encode(&self, session: &Session) -> Result<String, SessionError> {
        let exp = Utc::now()
            .timestamp()
            .checked_add(self.max_age_seconds)
            .ok_or(SessionError::MaxAge(self.max_age_seconds))?;
        self.encode_until(session, exp)
    }

    fn encode_until(&self, session: &Session, exp: i64) -> Result<String, SessionError> {
        let payload = SignedPayload {
            exp,
            session: session.clone(),
        };
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload)?);

        let mut mac = self.mac.clone();
        mac.update(body.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{body}.{signature}"))
    }

    fn decode(&self, value: &str) -> Result<Session, SessionError> {
        let (body, signature) = value.split_once('.').ok_or(SessionError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| SessionError::Malformed)?;

        let mut mac = self.mac.clone();
        mac.update(body.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| SessionError::Signature)?;

        let json = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|_| SessionError::Malformed)?;
        let payload: SignedPayload = serde_json::from_slice(&json)?;

        if payload.exp <= Utc::now().timestamp() {
            return Err(SessionError::Expired);
        }

        Ok(payload.session)
    }

    fn extract_cookie(&self, headers: &HeaderMap) -> Option<String> {
        for header in headers.get_all(COOKIE) {
            let Ok(value) = header.to_str() else {
                continue;
            };
            for pair in value.split(';') {
                let Some((key, val)) = pair.trim().split_once('=') else {
                    continue;
                };
                if key.trim() == self.name {
                    return Some(val.trim().to_string());
                }
            }
        }
        None
    }
}
