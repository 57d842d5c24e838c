//! Home page content blocks
//!
//! Statistics, activities, partners and banners share one table. Each kind
//! has its own required fields.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::ContentRepository;
use crate::models::{ContentBlock, ContentInput, ContentKind};
use crate::services::error::ServiceError;
use crate::services::home::HOME_CACHE_PATTERN;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

pub struct ContentService {
    repo: Arc<dyn ContentRepository>,
    cache: Arc<Cache>,
}

/// Fields that must be non-blank for `kind`
pub fn required_fields(kind: ContentKind) -> &'static [&'static str] {
    match kind {
        ContentKind::Statistic => &["title", "value"],
        ContentKind::Activity => &["title"],
        ContentKind::Partner => &["title", "image_url"],
        ContentKind::Banner => &["image_url"],
    }
}

fn validate(input: &ContentInput) -> Result<(), ServiceError> {
    for field in required_fields(input.kind) {
        let value = match *field {
            "title" => input.title.as_deref(),
            "value" => input.value.as_deref(),
            "image_url" => input.image_url.as_deref(),
            _ => None,
        };
        if value.map_or(true, |v| v.trim().is_empty()) {
            return Err(ServiceError::validation(format!(
                "{} is required for {} blocks",
                field, input.kind
            )));
        }
    }
    Ok(())
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ContentService {
    pub fn new(repo: Arc<dyn ContentRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    /// Create a block; without `sort_order` it goes after the last of its kind
    pub async fn create(&self, input: ContentInput) -> Result<ContentBlock, ServiceError> {
        validate(&input)?;

        let sort_order = match input.sort_order {
            Some(n) => n,
            None => self
                .repo
                .next_sort_order(input.kind)
                .await
                .context("Failed to read sort order")?,
        };
        let now = Utc::now();
        let block = ContentBlock {
            id: 0,
            kind: input.kind,
            title: clean(input.title),
            subtitle: clean(input.subtitle),
            body: clean(input.body),
            value: clean(input.value),
            image_url: clean(input.image_url),
            link_url: clean(input.link_url),
            sort_order,
            is_visible: input.is_visible,
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(&block).await.context("Failed to create content")?;
        self.invalidate_home().await?;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: ContentInput) -> Result<ContentBlock, ServiceError> {
        validate(&input)?;
        let existing = self.require(id).await?;

        let block = ContentBlock {
            kind: input.kind,
            title: clean(input.title),
            subtitle: clean(input.subtitle),
            body: clean(input.body),
            value: clean(input.value),
            image_url: clean(input.image_url),
            link_url: clean(input.link_url),
            sort_order: input.sort_order.unwrap_or(existing.sort_order),
            is_visible: input.is_visible,
            ..existing
        };

        let updated = self.repo.update(&block).await.context("Failed to update content")?;
        self.invalidate_home().await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete content")? {
            return Err(ServiceError::not_found(format!("Content block {}", id)));
        }
        self.invalidate_home().await?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<ContentBlock, ServiceError> {
        self.require(id).await
    }

    /// Blocks of one kind; the public site passes `visible_only = true`
    pub async fn list(
        &self,
        kind: ContentKind,
        visible_only: bool,
    ) -> Result<Vec<ContentBlock>, ServiceError> {
        Ok(self
            .repo
            .list(kind, visible_only)
            .await
            .context("Failed to list content")?)
    }

    pub async fn toggle_visible(&self, id: i64) -> Result<ContentBlock, ServiceError> {
        let block = self.require(id).await?;
        let visible = !block.is_visible;
        self.repo
            .set_visible(id, visible)
            .await
            .context("Failed to toggle visibility")?;
        self.invalidate_home().await?;
        Ok(ContentBlock {
            is_visible: visible,
            ..block
        })
    }

    /// Persist a drag-and-drop order. Ids of other kinds are ignored.
    pub async fn reorder(
        &self,
        kind: ContentKind,
        ids: &[i64],
    ) -> Result<Vec<ContentBlock>, ServiceError> {
        if ids.is_empty() {
            return Err(ServiceError::validation("ids cannot be empty"));
        }
        let updated = self.repo.reorder(kind, ids).await.context("Failed to reorder")?;
        tracing::debug!("Reordered {} {} blocks", updated, kind);
        self.invalidate_home().await?;
        self.list(kind, false).await
    }

    async fn require(&self, id: i64) -> Result<ContentBlock, ServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get content")?
            .ok_or_else(|| ServiceError::not_found(format!("Content block {}", id)))
    }

    async fn invalidate_home(&self) -> Result<(), ServiceError> {
        self.cache
            .delete_pattern(HOME_CACHE_PATTERN)
            .await
            .context("Failed to invalidate home cache")?;
        Ok(())
    }
}
