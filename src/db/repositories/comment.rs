//! Comment repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{with_pool, DynDatabasePool, LastInsertId};
use crate::models::{Comment, CommentStatus};

const COMMENT_COLUMNS: &str =
    "id, post_id, user_id, author_name, author_email, content, status, created_at, updated_at";

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment with the status already decided
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Comments on a post, oldest first
    async fn list_for_post(&self, post_id: i64, status: Option<CommentStatus>) -> Result<Vec<Comment>>;

    /// Moderation queue, newest first, with the unpaged total
    async fn list(
        &self,
        status: Option<CommentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Comment>, i64)>;

    /// Move a comment from `from` to `to`; false if it is no longer in `from`
    async fn update_status(&self, id: i64, from: CommentStatus, to: CommentStatus) -> Result<bool>;

    /// Delete a comment still in `status`
    async fn delete(&self, id: i64, status: CommentStatus) -> Result<bool>;

    async fn count_by_status(&self, status: CommentStatus) -> Result<i64>;
}

pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                INSERT INTO comments (post_id, user_id, author_name, author_email, content, status,
                                      created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(comment.post_id)
            .bind(comment.user_id)
            .bind(&comment.author_name)
            .bind(&comment.author_email)
            .bind(&comment.content)
            .bind(comment.status.as_str())
            .bind(now)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to create comment")?
            .last_id()
        });

        Ok(Comment {
            id,
            created_at: now,
            updated_at: now,
            ..comment.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS);
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Comment>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
                .context("Failed to get comment")
        })
    }

    async fn list_for_post(&self, post_id: i64, status: Option<CommentStatus>) -> Result<Vec<Comment>> {
        let sql = format!(
            "SELECT {} FROM comments WHERE post_id = ? AND (? IS NULL OR status = ?) \
             ORDER BY created_at ASC, id ASC",
            COMMENT_COLUMNS
        );
        let status = status.map(|s| s.as_str());
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Comment>(&sql)
                .bind(post_id)
                .bind(status)
                .bind(status)
                .fetch_all(p)
                .await
                .context("Failed to list post comments")
        })
    }

    async fn list(
        &self,
        status: Option<CommentStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Comment>, i64)> {
        let list_sql = format!(
            "SELECT {} FROM comments WHERE (? IS NULL OR status = ?) \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            COMMENT_COLUMNS
        );
        let status = status.map(|s| s.as_str());
        with_pool!(self.pool, |p| {
            let comments = sqlx::query_as::<_, Comment>(&list_sql)
                .bind(status)
                .bind(status)
                .bind(limit)
                .bind(offset.max(0))
                .fetch_all(p)
                .await
                .context("Failed to list comments")?;
            let total = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM comments WHERE (? IS NULL OR status = ?)",
            )
            .bind(status)
            .bind(status)
            .fetch_one(p)
            .await
            .context("Failed to count comments")?;
            Ok((comments, total))
        })
    }

    async fn update_status(&self, id: i64, from: CommentStatus, to: CommentStatus) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let result =
                sqlx::query("UPDATE comments SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
                    .bind(to.as_str())
                    .bind(Utc::now())
                    .bind(id)
                    .bind(from.as_str())
                    .execute(p)
                .await
                .context("Failed to update comment status")?;
            Ok(result.rows_affected() > 0)
        })
    }

    async fn delete(&self, id: i64, status: CommentStatus) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let result = sqlx::query("DELETE FROM comments WHERE id = ? AND status = ?")
                .bind(id)
                .bind(status.as_str())
                .execute(p)
                .await
                .context("Failed to delete comment")?;
            Ok(result.rows_affected() > 0)
        })
    }

    async fn count_by_status(&self, status: CommentStatus) -> Result<i64> {
        with_pool!(self.pool, |p| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE status = ?")
                .bind(status.as_str())
                .fetch_one(p)
                .await
                .context("Failed to count comments")
        })
    }
}
