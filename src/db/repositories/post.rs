//! Post repository
//!
//! Database operations for blog and activity posts.

use crate::db::{with_pool, DynDatabasePool, LastInsertId};
use crate::models::{Post, PostFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

const POST_COLUMNS: &str = "id, slug, title, excerpt, content, content_html, cover_url, category, \
                            author_id, is_published, published_at, view_count, comment_count, \
                            created_at, updated_at";

const FILTER_CLAUSE: &str = r#"
    WHERE (? IS NULL OR title LIKE ? OR excerpt LIKE ?)
      AND (? IS NULL OR category = ?)
      AND (? = 0 OR is_published = 1)
"#;

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: &Post) -> Result<Post>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Write content and publication columns. Counters are left alone.
    async fn update(&self, post: &Post) -> Result<Post>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Published posts first by `published_at`, drafts by `created_at`
    async fn list(&self, filter: &PostFilter) -> Result<(Vec<Post>, i64)>;

    /// Flag update; `published_at` is set the first time the post goes live
    async fn set_published(&self, id: i64, published: bool) -> Result<bool>;

    async fn increment_view_count(&self, id: i64) -> Result<()>;

    async fn adjust_comment_count(&self, id: i64, delta: i64) -> Result<()>;

    async fn count(&self, published_only: bool) -> Result<i64>;
}

pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        let now = Utc::now();
        let published_at = if post.is_published {
            post.published_at.or(Some(now))
        } else {
            post.published_at
        };

        let id = with_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                INSERT INTO posts (slug, title, excerpt, content, content_html, cover_url, category,
                                   author_id, is_published, published_at, view_count, comment_count,
                                   created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)
                "#,
            )
            .bind(&post.slug)
            .bind(&post.title)
            .bind(&post.excerpt)
            .bind(&post.content)
            .bind(&post.content_html)
            .bind(&post.cover_url)
            .bind(post.category.as_str())
            .bind(post.author_id)
            .bind(post.is_published)
            .bind(published_at)
            .bind(now)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to create post")?
            .last_id()
        });

        Ok(Post {
            id,
            published_at,
            view_count: 0,
            comment_count: 0,
            created_at: now,
            updated_at: now,
            ..post.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS);
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Post>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
                .context("Failed to get post by ID")
        })
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE slug = ?", POST_COLUMNS);
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, Post>(&sql)
                .bind(slug)
                .fetch_optional(p)
                .await
                .context("Failed to get post by slug")
        })
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let count = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM posts WHERE slug = ? AND (? IS NULL OR id <> ?)",
            )
            .bind(slug)
            .bind(exclude_id)
            .bind(exclude_id)
            .fetch_one(p)
            .await
            .context("Failed to check post slug")?;
            Ok(count > 0)
        })
    }

    async fn update(&self, post: &Post) -> Result<Post> {
        let now = Utc::now();
        let published_at = if post.is_published {
            post.published_at.or(Some(now))
        } else {
            post.published_at
        };

        with_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                UPDATE posts
                SET slug = ?, title = ?, excerpt = ?, content = ?, content_html = ?, cover_url = ?,
                    category = ?, is_published = ?, published_at = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&post.slug)
            .bind(&post.title)
            .bind(&post.excerpt)
            .bind(&post.content)
            .bind(&post.content_html)
            .bind(&post.cover_url)
            .bind(post.category.as_str())
            .bind(post.is_published)
            .bind(published_at)
            .bind(now)
            .bind(post.id)
            .execute(p)
            .await
            .context("Failed to update post")?;
            Ok::<_, anyhow::Error>(())
        })?;

        Ok(Post {
            published_at,
            updated_at: now,
            ..post.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let result = sqlx::query("DELETE FROM posts WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .context("Failed to delete post")?;
            Ok(result.rows_affected() > 0)
        })
    }

    async fn list(&self, filter: &PostFilter) -> Result<(Vec<Post>, i64)> {
        let pattern = filter
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q));
        let category = filter.category.map(|c| c.as_str());
        let published_only = filter.published_only as i32;
        let limit = if filter.limit > 0 { filter.limit } else { 10 };

        let list_sql = format!(
            "SELECT {} FROM posts {} \
             ORDER BY CASE WHEN published_at IS NULL THEN created_at ELSE published_at END DESC, id DESC \
             LIMIT ? OFFSET ?",
            POST_COLUMNS, FILTER_CLAUSE
        );
        let count_sql = format!("SELECT COUNT(*) FROM posts {}", FILTER_CLAUSE);

        with_pool!(self.pool, |p| {
            let posts = sqlx::query_as::<_, Post>(&list_sql)
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .bind(category)
                .bind(category)
                .bind(published_only)
                .bind(limit)
                .bind(filter.offset.max(0))
                .fetch_all(p)
                .await
                .context("Failed to list posts")?;
            let total = sqlx::query_scalar::<_, i64>(&count_sql)
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .bind(category)
                .bind(category)
                .bind(published_only)
                .fetch_one(p)
                .await
                .context("Failed to count posts")?;
            Ok((posts, total))
        })
    }

    async fn set_published(&self, id: i64, published: bool) -> Result<bool> {
        let now = Utc::now();
        with_pool!(self.pool, |p| {
            let result = sqlx::query(
                r#"
                UPDATE posts
                SET is_published = ?,
                    published_at = CASE WHEN ? = 1 AND published_at IS NULL THEN ? ELSE published_at END,
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(published)
            .bind(published as i32)
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(p)
            .await
            .context("Failed to update post visibility")?;
            Ok(result.rows_affected() > 0)
        })
    }

    async fn increment_view_count(&self, id: i64) -> Result<()> {
        with_pool!(self.pool, |p| {
            sqlx::query("UPDATE posts SET view_count = view_count + 1 WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .context("Failed to increment view count")?;
            Ok(())
        })
    }

    async fn adjust_comment_count(&self, id: i64, delta: i64) -> Result<()> {
        with_pool!(self.pool, |p| {
            sqlx::query(
                "UPDATE posts SET comment_count = CASE WHEN comment_count + ? < 0 THEN 0 \
                 ELSE comment_count + ? END WHERE id = ?",
            )
            .bind(delta)
            .bind(delta)
            .bind(id)
            .execute(p)
            .await
            .context("Failed to adjust comment count")?;
            Ok(())
        })
    }

    async fn count(&self, published_only: bool) -> Result<i64> {
        with_pool!(self.pool, |p| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE (? = 0 OR is_published = 1)")
                .bind(published_only as i32)
                .fetch_one(p)
                .await
                .context("Failed to count posts")
        })
    }
}
