//! In-memory account store
//!
//! Used by tests and local runs without PostgreSQL. The uniqueness check and
//! the insert happen under one write lock, so concurrent creates for the
//! same email yield exactly one account.

use super::{AccountRecord, AccountStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Accounts {
    by_id: HashMap<Uuid, AccountRecord>,
    id_by_email: HashMap<String, Uuid>,
}

#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<Accounts>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub fn len(&self) -> usize {
        self.accounts.read().map(|a| a.by_id.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("account map lock poisoned".to_string())
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, StoreError> {
        let accounts = self.accounts.read().map_err(poisoned)?;
        Ok(accounts
            .id_by_email
            .get(email)
            .and_then(|id| accounts.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountRecord>, StoreError> {
        let accounts = self.accounts.read().map_err(poisoned)?;
        Ok(accounts.by_id.get(&id).cloned())
    }

    async fn create(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<AccountRecord, StoreError> {
        let mut accounts = self.accounts.write().map_err(poisoned)?;
        if accounts.id_by_email.contains_key(email) {
            return Err(StoreError::Conflict);
        }

        let now = Utc::now();
        let record = AccountRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        accounts.id_by_email.insert(record.email.clone(), record.id);
        accounts.by_id.insert(record.id, record.clone());

        Ok(record)
    }
}
