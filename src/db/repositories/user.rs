//! User repository
//!
//! Database operations for user accounts and profiles.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::db::{with_pool, DynDatabasePool, LastInsertId};
use crate::models::{User, UserFilter, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const USER_COLUMNS: &str = "id, email, password_hash, full_name, avatar_url, phone, role, status, \
                            mentor_id, created_at, updated_at";

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by email (case-insensitive)
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get the profile linked to a mentor record
    async fn get_by_mentor(&self, mentor_id: i64) -> Result<Option<User>>;

    /// Write profile, role, status and mentor link
    async fn update(&self, user: &User) -> Result<User>;

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Count total users
    async fn count(&self) -> Result<i64>;

    async fn count_by_role(&self, role: UserRole) -> Result<i64>;

    /// Filtered listing, newest first, with the unpaged total
    async fn list(&self, filter: &UserFilter) -> Result<(Vec<User>, i64)>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        let email = user.email.trim().to_lowercase();

        let id = with_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                INSERT INTO users (email, password_hash, full_name, avatar_url, phone, role, status,
                                   mentor_id, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&email)
            .bind(&user.password_hash)
            .bind(&user.full_name)
            .bind(&user.avatar_url)
            .bind(&user.phone)
            .bind(user.role.as_str())
            .bind(user.status.as_str())
            .bind(user.mentor_id)
            .bind(now)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to create user")?
            .last_id()
        });

        Ok(User {
            id,
            email,
            created_at: now,
            updated_at: now,
            ..user.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, User>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
                .context("Failed to get user by ID")
        })
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
        let email = email.trim().to_lowercase();
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, User>(&sql)
                .bind(&email)
                .fetch_optional(p)
                .await
                .context("Failed to get user by email")
        })
    }

    async fn get_by_mentor(&self, mentor_id: i64) -> Result<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE mentor_id = ? ORDER BY id LIMIT 1",
            USER_COLUMNS
        );
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, User>(&sql)
                .bind(mentor_id)
                .fetch_optional(p)
                .await
                .context("Failed to get user by mentor")
        })
    }

    async fn update(&self, user: &User) -> Result<User> {
        let now = Utc::now();
        with_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                UPDATE users
                SET full_name = ?, avatar_url = ?, phone = ?, role = ?, status = ?, mentor_id = ?,
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&user.full_name)
            .bind(&user.avatar_url)
            .bind(&user.phone)
            .bind(user.role.as_str())
            .bind(user.status.as_str())
            .bind(user.mentor_id)
            .bind(now)
            .bind(user.id)
            .execute(p)
            .await
            .context("Failed to update user")?;
            Ok::<_, anyhow::Error>(())
        })?;

        Ok(User {
            updated_at: now,
            ..user.clone()
        })
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<()> {
        with_pool!(self.pool, |p| {
            sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
                .bind(password_hash)
                .bind(Utc::now())
                .bind(id)
                .execute(p)
                .await
                .context("Failed to update password")?;
            Ok(())
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM users WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .context("Failed to delete user")?;
            Ok(())
        })
    }

    async fn count(&self) -> Result<i64> {
        with_pool!(self.pool, |p| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
                .fetch_one(p)
                .await
                .context("Failed to count users")
        })
    }

    async fn count_by_role(&self, role: UserRole) -> Result<i64> {
        with_pool!(self.pool, |p| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = ?")
                .bind(role.as_str())
                .fetch_one(p)
                .await
                .context("Failed to count users by role")
        })
    }

    async fn list(&self, filter: &UserFilter) -> Result<(Vec<User>, i64)> {
        let pattern = filter.q.as_ref().map(|q| format!("%{}%", q.trim()));
        let role = filter.role.map(|r| r.as_str());
        let where_clause = "WHERE (? IS NULL OR full_name LIKE ? OR email LIKE ?) AND (? IS NULL OR role = ?)";
        let list_sql = format!(
            "SELECT {} FROM users {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            USER_COLUMNS, where_clause
        );
        let count_sql = format!("SELECT COUNT(*) FROM users {}", where_clause);
        let limit = if filter.limit > 0 { filter.limit } else { 20 };

        with_pool!(self.pool, |p| {
            let users = sqlx::query_as::<_, User>(&list_sql)
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .bind(role)
                .bind(role)
                .bind(limit)
                .bind(filter.offset.max(0))
                .fetch_all(p)
                .await
                .context("Failed to list users")?;
            let total = sqlx::query_scalar::<_, i64>(&count_sql)
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .bind(role)
                .bind(role)
                .fetch_one(p)
                .await
                .context("Failed to count users")?;
            Ok((users, total))
        })
    }
}
