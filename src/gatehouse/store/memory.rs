//! In-memory [`UserStore`] used by the handler tests.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use super::{NewUser, StoreError, User, UserStore, STATUS_ACTIVE};

#[derive(Default)]
pub(crate) struct MemoryUserStore {
    users: Mutex<Vec<User>>,
    fail: Mutex<bool>,
    lookups: AtomicUsize,
}

impl MemoryUserStore {
    /// Seed a user with an already-hashed password.
    pub(crate) fn with_user(self, email: &str, first_name: &str, hash: &str, status_id: i16) -> Self {
        let now = Utc::now();
        if let Ok(mut users) = self.users.lock() {
            users.push(User {
                id: Uuid::new_v4(),
                first_name: first_name.to_string(),
                last_name: "Lovelace".to_string(),
                email: email.to_string(),
                password: hash.to_string(),
                status_id,
                deleted: false,
                created_at: now,
                updated_at: now,
            });
        }
        self
    }

    /// Make every following call fail as if the database were down.
    pub(crate) fn fail(&self) {
        if let Ok(mut fail) = self.fail.lock() {
            *fail = true;
        }
    }

    /// Undo [`Self::fail`].
    pub(crate) fn recover(&self) {
        if let Ok(mut fail) = self.fail.lock() {
            *fail = false;
        }
    }

    /// Number of `fetch_*` calls served so far.
    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub(crate) fn count(&self, email: &str) -> usize {
        self.users
            .lock()
            .map(|users| users.iter().filter(|u| u.email == email).count())
            .unwrap_or(0)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail.lock().map(|f| *f).unwrap_or(true) {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn fetch_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let users = self.users.lock().map_err(|_| StoreError::NotFound)?;
        users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn fetch_id_by_email(&self, email: &str) -> Result<Uuid, StoreError> {
        self.fetch_by_email(email).await.map(|user| user.id)
    }

    async fn insert(&self, user: NewUser) -> Result<(), StoreError> {
        self.check()?;
        let mut users = self.users.lock().map_err(|_| StoreError::Conflict)?;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict);
        }
        let now = Utc::now();
        users.push(User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password: user.password,
            status_id: STATUS_ACTIVE,
            deleted: false,
            created_at: now,
            updated_at: now,
        });
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }
}
