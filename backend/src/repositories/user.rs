//! PostgreSQL account store

use super::{AccountRecord, AccountStore, StoreError};
use crate::db;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

/// Account store backed by the `users` table
///
/// Email uniqueness is enforced by the table's `UNIQUE` constraint.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Conflict,
        _ => {
            warn!(error = %err, "Account store query failed");
            StoreError::Unavailable(err.to_string())
        }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, StoreError> {
        sqlx::query_as::<_, AccountRecord>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountRecord>, StoreError> {
        sqlx::query_as::<_, AccountRecord>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)
    }

    async fn create(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<AccountRecord, StoreError> {
        // Single statement: either the whole row exists or nothing does.
        sqlx::query_as::<_, AccountRecord>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        db::health_check(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
