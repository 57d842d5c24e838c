//! Session repository
//!
//! Database operations for login and recovery sessions.

use crate::db::{with_pool, DynDatabasePool};
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Delete a session
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete all sessions for a user
    async fn delete_by_user(&self, user_id: i64) -> Result<()>;

    /// Delete all sessions for a user except `keep_id`
    async fn delete_others(&self, user_id: i64, keep_id: &str) -> Result<()>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self) -> Result<i64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        with_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                INSERT INTO sessions (id, user_id, is_recovery, expires_at, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&session.id)
            .bind(session.user_id)
            .bind(session.is_recovery)
            .bind(session.expires_at)
            .bind(session.created_at)
            .execute(p)
            .await
            .context("Failed to create session")?;
            Ok(session.clone())
        })
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Session>(
                "SELECT id, user_id, is_recovery, expires_at, created_at FROM sessions WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(p)
            .await
            .context("Failed to get session")
        })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        with_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM sessions WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .context("Failed to delete session")?;
            Ok(())
        })
    }

    async fn delete_by_user(&self, user_id: i64) -> Result<()> {
        with_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM sessions WHERE user_id = ?")
                .bind(user_id)
                .execute(p)
                .await
                .context("Failed to delete user sessions")?;
            Ok(())
        })
    }

    async fn delete_others(&self, user_id: i64, keep_id: &str) -> Result<()> {
        with_pool!(self.pool, |p| {
            sqlx::query("DELETE FROM sessions WHERE user_id = ? AND id <> ?")
                .bind(user_id)
                .bind(keep_id)
                .execute(p)
                .await
                .context("Failed to delete other sessions")?;
            Ok(())
        })
    }

    async fn delete_expired(&self) -> Result<i64> {
        with_pool!(self.pool, |p| {
            let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
                .bind(Utc::now())
                .execute(p)
                .await
                .context("Failed to delete expired sessions")?;
            Ok(result.rows_affected() as i64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::user::tests::{setup_test_repo as setup_users, test_user};
    use crate::db::repositories::UserRepository;
    use crate::models::UserRole;
    use chrono::Duration;
    use uuid::Uuid;

    async fn setup_test_repo() -> (SqlxSessionRepository, i64) {
        let (pool, users) = setup_users().await;
        let user = users
            .create(&test_user("ana@example.com", UserRole::User))
            .await
            .expect("Failed to create user");
        (SqlxSessionRepository::new(pool), user.id)
    }

    fn create_test_session(user_id: i64, expires_in_minutes: i64) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4().to_string(),
            user_id,
            is_recovery: false,
            expires_at: now + Duration::minutes(expires_in_minutes),
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let (repo, user_id) = setup_test_repo().await;

        let mut session = create_test_session(user_id, 60);
        session.is_recovery = true;
        repo.create(&session).await.expect("Failed to create session");

        let found = repo
            .get_by_id(&session.id)
            .await
            .expect("Failed to get session")
            .expect("Session not found");
        assert_eq!(found.user_id, user_id);
        assert!(found.is_recovery);
        assert!(!found.is_expired());

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_sessions() {
        let (repo, user_id) = setup_test_repo().await;
        let a = create_test_session(user_id, 60);
        let b = create_test_session(user_id, 60);
        let c = create_test_session(user_id, 60);
        for s in [&a, &b, &c] {
            repo.create(s).await.unwrap();
        }

        repo.delete(&a.id).await.unwrap();
        assert!(repo.get_by_id(&a.id).await.unwrap().is_none());

        repo.delete_others(user_id, &b.id).await.unwrap();
        assert!(repo.get_by_id(&b.id).await.unwrap().is_some());
        assert!(repo.get_by_id(&c.id).await.unwrap().is_none());

        repo.delete_by_user(user_id).await.unwrap();
        assert!(repo.get_by_id(&b.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_expired_sessions() {
        let (repo, user_id) = setup_test_repo().await;
        let expired = create_test_session(user_id, -5);
        let valid = create_test_session(user_id, 60);
        repo.create(&expired).await.unwrap();
        repo.create(&valid).await.unwrap();

        let removed = repo.delete_expired().await.unwrap();
        assert_eq!(removed, 1);
        assert!(repo.get_by_id(&valid.id).await.unwrap().is_some());
    }
}
