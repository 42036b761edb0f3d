//! Anti-forgery tokens bound to the session.
//!
//! Every rendered page gets a fresh token, stored in the session and embedded
//! in its forms. A POST is accepted only if it echoes the session's token.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};

use super::session::Session;

/// Form field carrying the token.
pub const TOKEN_FIELD: &str = "token";

/// Generate a new token and bind it to `session`, replacing any previous one.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn issue(session: &mut Session) -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate anti-forgery token")?;
    let token = URL_SAFE_NO_PAD.encode(bytes);
    session.set_csrf_token(token.clone());
    Ok(token)
}

/// Whether `submitted` matches the token bound to `session`.
#[must_use]
pub fn verify(session: &Session, submitted: Option<&str>) -> bool {
    match (session.csrf_token(), submitted) {
        (Some(expected), Some(submitted)) => constant_time_eq(expected.as_bytes(), submitted.as_bytes()),
        _ => false,
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
