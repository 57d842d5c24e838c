//! One-time auth code repository

use crate::db::{with_pool, DynDatabasePool, LastInsertId};
use crate::models::AuthCode;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait AuthCodeRepository: Send + Sync {
    /// Store a hashed code for `email`
    async fn create(&self, email: &str, code_hash: &str, expires_at: DateTime<Utc>) -> Result<AuthCode>;

    /// Newest unconsumed, unexpired code matching `email` and `code_hash`
    async fn find_usable(&self, email: &str, code_hash: &str) -> Result<Option<AuthCode>>;

    /// Mark consumed; false if it was already consumed
    async fn consume(&self, id: i64) -> Result<bool>;

    /// Count a wrong guess against the outstanding codes of `email`; codes
    /// reaching `max_attempts` are consumed. Returns how many were burned.
    async fn record_miss(&self, email: &str, max_attempts: i32) -> Result<u64>;

    /// Invalidate every outstanding code for `email`
    async fn consume_all(&self, email: &str) -> Result<()>;

    async fn delete_expired(&self) -> Result<i64>;
}

pub struct SqlxAuthCodeRepository {
    pool: DynDatabasePool,
}

impl SqlxAuthCodeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AuthCodeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AuthCodeRepository for SqlxAuthCodeRepository {
    async fn create(&self, email: &str, code_hash: &str, expires_at: DateTime<Utc>) -> Result<AuthCode> {
        let now = Utc::now();
        let email = email.trim().to_lowercase();
        let id = with_pool!(self.pool, |p| {
            sqlx::query(
                "INSERT INTO auth_codes (email, code_hash, expires_at, created_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&email)
            .bind(code_hash)
            .bind(expires_at)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to store auth code")?
            .last_id()
        });

        Ok(AuthCode {
            id,
            email,
            code_hash: code_hash.to_string(),
            attempts: 0,
            expires_at,
            consumed_at: None,
            created_at: now,
        })
    }

    async fn find_usable(&self, email: &str, code_hash: &str) -> Result<Option<AuthCode>> {
        let email = email.trim().to_lowercase();
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, AuthCode>(
                r#"
                SELECT id, email, code_hash, attempts, expires_at, consumed_at, created_at
                FROM auth_codes
                WHERE email = ? AND code_hash = ? AND consumed_at IS NULL AND expires_at > ?
                ORDER BY id DESC
                LIMIT 1
                "#,
            )
            .bind(&email)
            .bind(code_hash)
            .bind(Utc::now())
            .fetch_optional(p)
            .await
            .context("Failed to look up auth code")
        })
    }

    async fn consume(&self, id: i64) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let result =
                sqlx::query("UPDATE auth_codes SET consumed_at = ? WHERE id = ? AND consumed_at IS NULL")
                    .bind(Utc::now())
                    .bind(id)
                    .execute(p)
                    .await
                    .context("Failed to consume auth code")?;
            Ok(result.rows_affected() > 0)
        })
    }

    async fn record_miss(&self, email: &str, max_attempts: i32) -> Result<u64> {
        let email = email.trim().to_lowercase();
        let now = Utc::now();
        with_pool!(self.pool, |p| {
            sqlx::query(
                "UPDATE auth_codes SET attempts = attempts + 1 WHERE email = ? AND consumed_at IS NULL AND expires_at > ?",
            )
            .bind(&email)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to count auth code attempt")?;
            let burned = sqlx::query(
                "UPDATE auth_codes SET consumed_at = ? WHERE email = ? AND consumed_at IS NULL AND attempts >= ?",
            )
            .bind(now)
            .bind(&email)
            .bind(max_attempts)
            .execute(p)
            .await
            .context("Failed to burn auth codes")?;
            Ok(burned.rows_affected())
        })
    }

    async fn consume_all(&self, email: &str) -> Result<()> {
        let email = email.trim().to_lowercase();
        with_pool!(self.pool, |p| {
            sqlx::query("UPDATE auth_codes SET consumed_at = ? WHERE email = ? AND consumed_at IS NULL")
                .bind(Utc::now())
                .bind(&email)
                .execute(p)
                .await
                .context("Failed to invalidate auth codes")?;
            Ok(())
        })
    }

    async fn delete_expired(&self) -> Result<i64> {
        with_pool!(self.pool, |p| {
            let result = sqlx::query("DELETE FROM auth_codes WHERE expires_at < ? OR consumed_at IS NOT NULL")
                .bind(Utc::now())
                .execute(p)
                .await
                .context("Failed to delete expired auth codes")?;
            Ok(result.rows_affected() as i64)
        })
    }
}
