//! Home page content
//!
//! The four content kinds load as one concurrent group, alongside featured
//! mentors and the latest posts. The assembled payload is cached until a
//! content, mentor or post write invalidates it.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{ContentRepository, PostRepository};
use crate::models::{ContentBlock, ContentKind, MentorWithSkills, Post, PostFilter};
use crate::services::error::ServiceError;
use crate::services::mentor::MentorService;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const HOME_CACHE_KEY: &str = "home";

/// Matches every cached home variant
pub const HOME_CACHE_PATTERN: &str = "home*";

const FEATURED_MENTORS: u32 = 6;
const LATEST_POSTS: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeContent {
    pub statistics: Vec<ContentBlock>,
    pub activities: Vec<ContentBlock>,
    pub partners: Vec<ContentBlock>,
    pub banners: Vec<ContentBlock>,
    pub featured_mentors: Vec<MentorWithSkills>,
    pub latest_posts: Vec<Post>,
}

pub struct HomeService {
    content: Arc<dyn ContentRepository>,
    posts: Arc<dyn PostRepository>,
    mentors: Arc<MentorService>,
    cache: Arc<Cache>,
}

impl HomeService {
    pub fn new(
        content: Arc<dyn ContentRepository>,
        posts: Arc<dyn PostRepository>,
        mentors: Arc<MentorService>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            content,
            posts,
            mentors,
            cache,
        }
    }

    /// Cached home payload
    pub async fn load(&self) -> Result<HomeContent, ServiceError> {
        match self.cache.get::<HomeContent>(HOME_CACHE_KEY).await {
            Ok(Some(home)) => return Ok(home),
            Ok(None) => {}
            Err(e) => tracing::warn!("Ignoring unreadable home cache entry: {}", e),
        }

        let home = self.load_uncached().await?;
        if let Err(e) = self
            .cache
            .set(HOME_CACHE_KEY, &home, self.cache.default_ttl())
            .await
        {
            tracing::warn!("Failed to cache home content: {}", e);
        }
        Ok(home)
    }

    async fn load_uncached(&self) -> Result<HomeContent, ServiceError> {
        let visible = |kind: ContentKind| async move {
            self.content
                .list(kind, true)
                .await
                .with_context(|| format!("Failed to load {}", kind))
                .map_err(ServiceError::from)
        };
        let latest = async {
            let filter = PostFilter {
                limit: LATEST_POSTS,
                ..PostFilter::default()
            };
            self.posts
                .list(&filter)
                .await
                .map(|(posts, _)| posts)
                .context("Failed to load latest posts")
                .map_err(ServiceError::from)
        };

        let (statistics, activities, partners, banners, featured_mentors, latest_posts) = tokio::try_join!(
            visible(ContentKind::Statistic),
            visible(ContentKind::Activity),
            visible(ContentKind::Partner),
            visible(ContentKind::Banner),
            self.mentors.featured(FEATURED_MENTORS),
            latest,
        )?;

        Ok(HomeContent {
            statistics,
            activities,
            partners,
            banners,
            featured_mentors,
            latest_posts,
        })
    }

    pub async fn invalidate(&self) -> Result<(), ServiceError> {
        self.cache
            .delete_pattern(HOME_CACHE_PATTERN)
            .await
            .context("Failed to invalidate home cache")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::post::tests::test_post;
    use crate::db::repositories::{SqlxContentRepository, SqlxPostRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::MentorInput;
    use chrono::Utc;

    fn block(kind: ContentKind, title: &str, visible: bool) -> ContentBlock {
        let now = Utc::now();
        ContentBlock {
            id: 0,
            kind,
            title: Some(title.to_string()),
            subtitle: None,
            body: None,
            value: Some("1".to_string()),
            image_url: Some("/storage/content/x.png".to_string()),
            link_url: None,
            sort_order: 0,
            is_visible: visible,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_load_groups_and_caches() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let cache = create_cache(&CacheConfig::default());
        let content = SqlxContentRepository::boxed(pool.clone());
        let posts = SqlxPostRepository::boxed(pool.clone());
        let mentors = Arc::new(crate::services::mentor::tests::build_service(&pool, cache.clone()));
        let service = HomeService::new(content.clone(), posts.clone(), mentors.clone(), cache);

        content.create(&block(ContentKind::Statistic, "Mentors", true)).await.unwrap();
        content.create(&block(ContentKind::Statistic, "Hidden", false)).await.unwrap();
        content.create(&block(ContentKind::Partner, "Acme", true)).await.unwrap();
        posts.create(&test_post("hello", true)).await.unwrap();
        posts.create(&test_post("draft", false)).await.unwrap();
        mentors
            .create(MentorInput {
                full_name: "Ana".to_string(),
                title: "Recruiter".to_string(),
                is_published: true,
                is_featured: true,
                ..Default::default()
            })
            .await
            .unwrap();

        let home = service.load().await.unwrap();
        assert_eq!(home.statistics.len(), 1);
        assert_eq!(home.partners.len(), 1);
        assert!(home.activities.is_empty());
        assert_eq!(home.featured_mentors.len(), 1);
        assert_eq!(home.latest_posts.len(), 1);

        // Served from cache until invalidated
        content.create(&block(ContentKind::Banner, "Hero", true)).await.unwrap();
        assert!(service.load().await.unwrap().banners.is_empty());
        service.invalidate().await.unwrap();
        assert_eq!(service.load().await.unwrap().banners.len(), 1);
    }
}
