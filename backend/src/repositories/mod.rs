//! Account store adapters
//!
//! The credential core reaches accounts only through `AccountStore`. The
//! store, not the caller's pre-check, is the final arbiter of email
//! uniqueness and must report a violation as `StoreError::Conflict`.

pub mod memory;
pub mod user;

pub use memory::MemoryAccountStore;
pub use user::PgAccountStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pomodeep_shared::AccountView;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Account record as stored
#[derive(Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AccountRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountRecord {
    /// Public view without the password hash
    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id,
            email: self.email.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Account store failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("an account with this email already exists")]
    Conflict,

    #[error("account store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed lookup and insert of accounts
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountRecord>, StoreError>;

    /// Insert a new account; `Conflict` if the email is taken
    async fn create(&self, email: &str, password_hash: &str)
        -> Result<AccountRecord, StoreError>;

    /// Readiness check
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
