//! Review repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{with_pool, DynDatabasePool, LastInsertId};
use crate::models::{Review, ReviewView};

const REVIEW_COLUMNS: &str = "id, mentor_id, user_id, rating, content, is_visible, created_at";

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn create(&self, review: &Review) -> Result<Review>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Review>>;

    async fn find_by_author(&self, mentor_id: i64, user_id: i64) -> Result<Option<Review>>;

    /// Reviews for a mentor with author names, newest first
    async fn list_for_mentor(
        &self,
        mentor_id: i64,
        visible_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ReviewView>, i64)>;

    /// Flip visibility to `visible`; false if it already was (or the review is gone)
    async fn set_visible(&self, id: i64, visible: bool) -> Result<bool>;

    /// Delete a review whose visibility is still `visible`
    async fn delete(&self, id: i64, visible: bool) -> Result<bool>;
}

pub struct SqlxReviewRepository {
    pool: DynDatabasePool,
}

impl SqlxReviewRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ReviewRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ReviewRepository for SqlxReviewRepository {
    async fn create(&self, review: &Review) -> Result<Review> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                INSERT INTO reviews (mentor_id, user_id, rating, content, is_visible, created_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(review.mentor_id)
            .bind(review.user_id)
            .bind(review.rating)
            .bind(&review.content)
            .bind(review.is_visible)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to create review")?
            .last_id()
        });

        Ok(Review {
            id,
            created_at: now,
            ..review.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Review>> {
        let sql = format!("SELECT {} FROM reviews WHERE id = ?", REVIEW_COLUMNS);
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Review>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
                .context("Failed to get review")
        })
    }

    async fn find_by_author(&self, mentor_id: i64, user_id: i64) -> Result<Option<Review>> {
        let sql = format!(
            "SELECT {} FROM reviews WHERE mentor_id = ? AND user_id = ?",
            REVIEW_COLUMNS
        );
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Review>(&sql)
                .bind(mentor_id)
                .bind(user_id)
                .fetch_optional(p)
                .await
                .context("Failed to find review")
        })
    }

    async fn list_for_mentor(
        &self,
        mentor_id: i64,
        visible_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<ReviewView>, i64)> {
        let visible_only = visible_only as i32;
        with_pool!(self.pool, |p| {
            let items = sqlx::query_as::<_, ReviewView>(
                r#"
                SELECT r.id, r.mentor_id, r.user_id, r.rating, r.content, r.is_visible, r.created_at,
                       u.full_name AS author_name, u.avatar_url AS author_avatar
                FROM reviews r
                JOIN users u ON u.id = r.user_id
                WHERE r.mentor_id = ? AND (? = 0 OR r.is_visible = 1)
                ORDER BY r.created_at DESC, r.id DESC
                LIMIT ? OFFSET ?
                "#,
            )
            .bind(mentor_id)
            .bind(visible_only)
            .bind(limit)
            .bind(offset.max(0))
            .fetch_all(p)
            .await
            .context("Failed to list reviews")?;
            let total = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM reviews r WHERE r.mentor_id = ? AND (? = 0 OR r.is_visible = 1)",
            )
            .bind(mentor_id)
            .bind(visible_only)
            .fetch_one(p)
            .await
            .context("Failed to count reviews")?;
            Ok((items, total))
        })
    }

    async fn set_visible(&self, id: i64, visible: bool) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let result = sqlx::query("UPDATE reviews SET is_visible = ? WHERE id = ? AND is_visible = ?")
                .bind(visible)
                .bind(id)
                .bind(!visible)
                .execute(p)
                .await
                .context("Failed to update review visibility")?;
            Ok(result.rows_affected() > 0)
        })
    }

    async fn delete(&self, id: i64, visible: bool) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let result = sqlx::query("DELETE FROM reviews WHERE id = ? AND is_visible = ?")
                .bind(id)
                .bind(visible)
                .execute(p)
                .await
                .context("Failed to delete review")?;
            Ok(result.rows_affected() > 0)
        })
    }
}
