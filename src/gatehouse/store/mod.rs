//! Credential store: user records keyed by email.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[cfg(test)]
pub(crate) mod memory;
mod postgres;

pub use postgres::PgUserStore;

/// `user_status.id` of an active account.
pub const STATUS_ACTIVE: i16 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No user with the requested email.
    #[error("user not found")]
    NotFound,
    /// The email is already registered.
    #[error("email already registered")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub status_id: i16,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status_id == STATUS_ACTIVE
    }
}

/// Fields supplied at registration; `password` is already hashed.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// # Errors
    /// [`StoreError::NotFound`] when no row matches, [`StoreError::Database`] otherwise.
    async fn fetch_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// # Errors
    /// [`StoreError::NotFound`] when no row matches, [`StoreError::Database`] otherwise.
    async fn fetch_id_by_email(&self, email: &str) -> Result<Uuid, StoreError>;

    /// # Errors
    /// [`StoreError::Conflict`] when the email is taken, [`StoreError::Database`] otherwise.
    async fn insert(&self, user: NewUser) -> Result<(), StoreError>;

    /// # Errors
    /// Returns an error if the backing database is unreachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
