//! Password hashing with Argon2id (PHC string format).

use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier as _,
};
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(String);

impl HashError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

pub trait Passhash: Send + Sync {
    /// Hash a plaintext password for storage.
    ///
    /// # Errors
    /// Returns an error if the hasher fails internally.
    fn hash(&self, password: &str) -> Result<String, HashError>;

    /// Compare a candidate against a stored hash. Unparseable hashes never match.
    fn matches(&self, hash: &str, candidate: &str) -> bool;
}

#[derive(Clone, Debug, Default)]
pub struct Argon2Passhash;

impl Passhash for Argon2Passhash {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| HashError::new(err.to_string()))
    }

    fn matches(&self, hash: &str, candidate: &str) -> bool {
        PasswordHash::new(hash).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(candidate.as_bytes(), &parsed)
                .is_ok()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_match() {
        let hasher = Argon2Passhash;
        let hash = hasher.hash("correct horse").expect("hash");
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.matches(&hash, "correct horse"));
        assert!(!hasher.matches(&hash, "battery staple"));
    }

    #[test]
    fn hashes_are_salted() {
        let hasher = Argon2Passhash;
        let first = hasher.hash("secret").expect("hash");
        let second = hasher.hash("secret").expect("hash");
        assert_ne!(first, second);
    }

    #[test]
    fn garbage_hash_never_matches() {
        assert!(!Argon2Passhash.matches("not-a-phc-string", "secret"));
        assert!(!Argon2Passhash.matches("", ""));
    }
}
