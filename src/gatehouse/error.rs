//! Failure kinds surfaced by the request handlers.
//!
//! A store lookup miss is not listed here: each handler decides what a miss
//! means (a wrong password for login, a free email for registration).

use thiserror::Error;
use tracing::error;

use super::session::Flash;

/// The only text a visitor sees for infrastructure failures.
pub const GENERIC_ERROR: &str = "An error occurred on the server. Please try again later.";

/// Longest accepted form field, in characters. Matches the `maxlength` of the
/// form inputs and keeps the session cookie well under 4 KB.
pub const MAX_FIELD_LEN: usize = 48;

#[derive(Debug, Error)]
pub enum AuthError {
    /// A required form field is absent or empty.
    #[error("Field missing: {0}")]
    Validation(&'static str),
    /// A form field exceeds [`MAX_FIELD_LEN`].
    #[error("Field too long: {0}")]
    TooLong(&'static str),
    /// The email is already registered.
    #[error("Account already exists for: {0}")]
    Conflict(String),
    /// Database, hasher or CAPTCHA transport failure.
    #[error("{0:#}")]
    Infrastructure(anyhow::Error),
}

impl AuthError {
    pub fn infrastructure(err: impl Into<anyhow::Error>) -> Self {
        Self::Infrastructure(err.into())
    }

    /// Log infrastructure failures and turn any failure into the flash shown
    /// to the visitor. Internal error text never reaches the flash.
    #[must_use]
    pub fn report(self) -> Flash {
        match self {
            Self::Validation(_) | Self::TooLong(_) | Self::Conflict(_) => {
                Flash::error(self.to_string())
            }
            Self::Infrastructure(err) => {
                error!("{err:#}");
                Flash::error(GENERIC_ERROR)
            }
        }
    }
}

/// Return the first field that is absent, empty or too long, in declaration
/// order.
///
/// # Errors
/// [`AuthError::Validation`] naming the missing field, or
/// [`AuthError::TooLong`] naming the oversized one.
pub fn require<'a, const N: usize>(
    fields: [(&'static str, Option<&'a str>); N],
) -> Result<[&'a str; N], AuthError> {
    let mut values = [""; N];
    for (slot, (name, value)) in values.iter_mut().zip(fields) {
        match value {
            Some(value) if value.chars().count() > MAX_FIELD_LEN => {
                return Err(AuthError::TooLong(name));
            }
            Some(value) if !value.is_empty() => *slot = value,
            _ => return Err(AuthError::Validation(name)),
        }
    }
    Ok(values)
}
