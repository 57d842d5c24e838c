//! Content block repository
//!
//! Statistics, activities, partners and banners for the home page.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{with_pool, DynDatabasePool, LastInsertId};
use crate::models::{ContentBlock, ContentKind};

const CONTENT_COLUMNS: &str = "id, kind, title, subtitle, body, value, image_url, link_url, \
                               sort_order, is_visible, created_at, updated_at";

#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn create(&self, block: &ContentBlock) -> Result<ContentBlock>;

    async fn get_by_id(&self, id: i64) -> Result<Option<ContentBlock>>;

    async fn update(&self, block: &ContentBlock) -> Result<ContentBlock>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Blocks of `kind` ordered by `sort_order`, then id
    async fn list(&self, kind: ContentKind, visible_only: bool) -> Result<Vec<ContentBlock>>;

    async fn set_visible(&self, id: i64, visible: bool) -> Result<bool>;

    /// Sort order one past the last block of `kind`
    async fn next_sort_order(&self, kind: ContentKind) -> Result<i32>;

    /// Write `sort_order = position` for each id of `kind`, in one transaction.
    /// Returns the number of rows updated.
    async fn reorder(&self, kind: ContentKind, ids: &[i64]) -> Result<u64>;
}

pub struct SqlxContentRepository {
    pool: DynDatabasePool,
}

impl SqlxContentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ContentRepository for SqlxContentRepository {
    async fn create(&self, block: &ContentBlock) -> Result<ContentBlock> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                INSERT INTO content_blocks (kind, title, subtitle, body, value, image_url, link_url,
                                            sort_order, is_visible, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(block.kind.as_str())
            .bind(&block.title)
            .bind(&block.subtitle)
            .bind(&block.body)
            .bind(&block.value)
            .bind(&block.image_url)
            .bind(&block.link_url)
            .bind(block.sort_order)
            .bind(block.is_visible)
            .bind(now)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to create content block")?
            .last_id()
        });

        Ok(ContentBlock {
            id,
            created_at: now,
            updated_at: now,
            ..block.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ContentBlock>> {
        let sql = format!("SELECT {} FROM content_blocks WHERE id = ?", CONTENT_COLUMNS);
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, ContentBlock>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
                .context("Failed to get content block")
        })
    }

    async fn update(&self, block: &ContentBlock) -> Result<ContentBlock> {
        let now = Utc::now();
        with_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                UPDATE content_blocks
                SET kind = ?, title = ?, subtitle = ?, body = ?, value = ?, image_url = ?,
                    link_url = ?, sort_order = ?, is_visible = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(block.kind.as_str())
            .bind(&block.title)
            .bind(&block.subtitle)
            .bind(&block.body)
            .bind(&block.value)
            .bind(&block.image_url)
            .bind(&block.link_url)
            .bind(block.sort_order)
            .bind(block.is_visible)
            .bind(now)
            .bind(block.id)
            .execute(p)
            .await
            .context("Failed to update content block")?;
            Ok::<_, anyhow::Error>(())
        })?;

        Ok(ContentBlock {
            updated_at: now,
            ..block.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let result = sqlx::query("DELETE FROM content_blocks WHERE id = ?")
                .bind(id)
                .execute(p)
                .await
                .context("Failed to delete content block")?;
            Ok(result.rows_affected() > 0)
        })
    }

    async fn list(&self, kind: ContentKind, visible_only: bool) -> Result<Vec<ContentBlock>> {
        let sql = format!(
            "SELECT {} FROM content_blocks WHERE kind = ? AND (? = 0 OR is_visible = 1) \
             ORDER BY sort_order ASC, id ASC",
            CONTENT_COLUMNS
        );
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, ContentBlock>(&sql)
                .bind(kind.as_str())
                .bind(visible_only as i32)
                .fetch_all(p)
                .await
                .with_context(|| format!("Failed to list {} blocks", kind))
        })
    }

    async fn set_visible(&self, id: i64, visible: bool) -> Result<bool> {
        with_pool!(self.pool, |p| {
            let result =
                sqlx::query("UPDATE content_blocks SET is_visible = ?, updated_at = ? WHERE id = ?")
                    .bind(visible)
                    .bind(Utc::now())
                    .bind(id)
                    .execute(p)
                    .await
                    .context("Failed to update content visibility")?;
            Ok(result.rows_affected() > 0)
        })
    }

    async fn next_sort_order(&self, kind: ContentKind) -> Result<i32> {
        // Highest sort_order via ORDER BY; an aggregate decodes differently per driver
        let last = with_pool!(self.pool, |p| {
            sqlx::query_scalar::<_, i32>(
                "SELECT sort_order FROM content_blocks WHERE kind = ? ORDER BY sort_order DESC LIMIT 1",
            )
            .bind(kind.as_str())
            .fetch_optional(p)
            .await
            .context("Failed to read sort order")?
        });
        Ok(last.map_or(0, |n| n + 1))
    }

    async fn reorder(&self, kind: ContentKind, ids: &[i64]) -> Result<u64> {
        let now = Utc::now();
        with_pool!(self.pool, |p| {
            let mut tx = p.begin().await.context("Failed to begin transaction")?;
            let mut updated = 0;
            for (position, id) in ids.iter().enumerate() {
                let result = sqlx::query(
                    "UPDATE content_blocks SET sort_order = ?, updated_at = ? WHERE id = ? AND kind = ?",
                )
                .bind(position as i32)
                .bind(now)
                .bind(*id)
                .bind(kind.as_str())
                .execute(&mut *tx)
                .await
                .context("Failed to reorder content")?;
                updated += result.rows_affected();
            }
            tx.commit().await.context("Failed to commit reorder")?;
            Ok(updated)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxContentRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        SqlxContentRepository::new(pool)
    }

    fn block(kind: ContentKind, title: &str, sort_order: i32) -> ContentBlock {
        let now = Utc::now();
        ContentBlock {
            id: 0,
            kind,
            title: Some(title.to_string()),
            subtitle: None,
            body: None,
            value: Some("10".to_string()),
            image_url: None,
            link_url: None,
            sort_order,
            is_visible: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn titles(blocks: &[ContentBlock]) -> Vec<&str> {
        blocks.iter().filter_map(|b| b.title.as_deref()).collect()
    }

    #[tokio::test]
    async fn test_list_by_kind_and_visibility() {
        let repo = setup_test_repo().await;
        repo.create(&block(ContentKind::Statistic, "Mentors", 1)).await.unwrap();
        let hidden = repo.create(&block(ContentKind::Statistic, "Hidden", 0)).await.unwrap();
        repo.create(&block(ContentKind::Activity, "Meetup", 0)).await.unwrap();
        repo.set_visible(hidden.id, false).await.unwrap();

        let visible = repo.list(ContentKind::Statistic, true).await.unwrap();
        assert_eq!(titles(&visible), vec!["Mentors"]);

        let all = repo.list(ContentKind::Statistic, false).await.unwrap();
        assert_eq!(titles(&all), vec!["Hidden", "Mentors"]);
    }

    #[tokio::test]
    async fn test_next_sort_order() {
        let repo = setup_test_repo().await;
        assert_eq!(repo.next_sort_order(ContentKind::Banner).await.unwrap(), 0);
        repo.create(&block(ContentKind::Banner, "a", 4)).await.unwrap();
        assert_eq!(repo.next_sort_order(ContentKind::Banner).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_reorder_by_position() {
        let repo = setup_test_repo().await;
        let a = repo.create(&block(ContentKind::Partner, "a", 0)).await.unwrap();
        let b = repo.create(&block(ContentKind::Partner, "b", 1)).await.unwrap();
        let c = repo.create(&block(ContentKind::Partner, "c", 2)).await.unwrap();
        let other = repo.create(&block(ContentKind::Banner, "x", 0)).await.unwrap();

        let updated = repo
            .reorder(ContentKind::Partner, &[c.id, a.id, b.id, other.id])
            .await
            .unwrap();
        assert_eq!(updated, 3);

        let list = repo.list(ContentKind::Partner, false).await.unwrap();
        assert_eq!(titles(&list), vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = setup_test_repo().await;
        let mut stat = repo.create(&block(ContentKind::Statistic, "Mentors", 0)).await.unwrap();
        stat.value = Some("120+".to_string());
        repo.update(&stat).await.unwrap();
        assert_eq!(
            repo.get_by_id(stat.id).await.unwrap().unwrap().value.as_deref(),
            Some("120+")
        );

        assert!(repo.delete(stat.id).await.unwrap());
        assert!(repo.get_by_id(stat.id).await.unwrap().is_none());
    }
}
