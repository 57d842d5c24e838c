//! Post service
//!
//! Blog and activity posts: validation, markdown rendering on write, slug
//! handling, publication and view counting.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::PostRepository;
use crate::models::{PageParams, PagedResult, Post, PostFilter, PostInput};
use crate::services::error::{require_fields, ServiceError};
use crate::services::home::HOME_CACHE_PATTERN;
use crate::services::markdown::MarkdownRenderer;
use crate::services::slug::unique_slug;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Length of generated excerpts, in characters
const EXCERPT_LENGTH: usize = 200;

pub struct PostService {
    repo: Arc<dyn PostRepository>,
    cache: Arc<Cache>,
    markdown: MarkdownRenderer,
}

impl PostService {
    pub fn new(repo: Arc<dyn PostRepository>, cache: Arc<Cache>) -> Self {
        Self {
            repo,
            cache,
            markdown: MarkdownRenderer::new(),
        }
    }

    pub async fn create(
        &self,
        author_id: Option<i64>,
        input: PostInput,
    ) -> Result<Post, ServiceError> {
        require_fields(&[("title", &input.title), ("content", &input.content)])?;

        let slug = self.unique_slug(input.slug.as_deref(), &input.title, None).await?;
        let now = Utc::now();
        let post = Post {
            id: 0,
            slug,
            title: input.title.trim().to_string(),
            excerpt: Some(self.excerpt_for(input.excerpt, &input.content)),
            content_html: self.markdown.render(&input.content),
            content: input.content,
            cover_url: input.cover_url.filter(|u| !u.trim().is_empty()),
            category: input.category,
            author_id,
            is_published: input.is_published,
            published_at: None,
            view_count: 0,
            comment_count: 0,
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(&post).await.context("Failed to create post")?;
        tracing::info!("Created post {} ({})", created.id, created.slug);
        self.invalidate_home().await?;
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: PostInput) -> Result<Post, ServiceError> {
        require_fields(&[("title", &input.title), ("content", &input.content)])?;
        let existing = self.require(id).await?;

        let slug = match input.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(requested) if requested == existing.slug => existing.slug.clone(),
            Some(requested) => self.unique_slug(Some(requested), &input.title, Some(id)).await?,
            None => existing.slug.clone(),
        };
        let published_at = match (input.is_published, existing.published_at) {
            (true, None) => Some(Utc::now()),
            (_, at) => at,
        };

        let post = Post {
            slug,
            title: input.title.trim().to_string(),
            excerpt: Some(self.excerpt_for(input.excerpt, &input.content)),
            content_html: self.markdown.render(&input.content),
            content: input.content,
            cover_url: input.cover_url.filter(|u| !u.trim().is_empty()),
            category: input.category,
            is_published: input.is_published,
            published_at,
            ..existing
        };

        let updated = self.repo.update(&post).await.context("Failed to update post")?;
        self.invalidate_home().await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        if !self.repo.delete(id).await.context("Failed to delete post")? {
            return Err(ServiceError::not_found(format!("Post {}", id)));
        }
        self.invalidate_home().await?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Post, ServiceError> {
        self.require(id).await
    }

    /// Published post by slug, counting the view
    pub async fn view(&self, slug: &str) -> Result<Post, ServiceError> {
        let mut post = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get post by slug")?
            .filter(|p| p.is_published)
            .ok_or_else(|| ServiceError::not_found(format!("Post '{}'", slug)))?;

        self.repo
            .increment_view_count(post.id)
            .await
            .context("Failed to count view")?;
        post.view_count += 1;
        Ok(post)
    }

    /// Paged listing. Blank `q` is treated as no search.
    pub async fn list(
        &self,
        mut filter: PostFilter,
        params: PageParams,
    ) -> Result<PagedResult<Post>, ServiceError> {
        filter.q = filter.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty());
        filter.limit = params.limit();
        filter.offset = params.offset();

        let (posts, total) = self.repo.list(&filter).await.context("Failed to list posts")?;
        Ok(PagedResult::new(posts, total, params))
    }

    /// Flip `is_published`; the first publish stamps `published_at`
    pub async fn toggle_published(&self, id: i64) -> Result<Post, ServiceError> {
        let post = self.require(id).await?;
        if !self
            .repo
            .set_published(id, !post.is_published)
            .await
            .context("Failed to toggle post")?
        {
            return Err(ServiceError::not_found(format!("Post {}", id)));
        }
        self.invalidate_home().await?;
        self.require(id).await
    }

    pub async fn count(&self, published_only: bool) -> Result<i64, ServiceError> {
        Ok(self.repo.count(published_only).await.context("Failed to count posts")?)
    }

    fn excerpt_for(&self, excerpt: Option<String>, content: &str) -> String {
        match excerpt.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()) {
            Some(e) => e,
            None => self.markdown.excerpt(content, EXCERPT_LENGTH),
        }
    }

    async fn require(&self, id: i64) -> Result<Post, ServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or_else(|| ServiceError::not_found(format!("Post {}", id)))
    }

    async fn unique_slug(
        &self,
        requested: Option<&str>,
        title: &str,
        exclude_id: Option<i64>,
    ) -> Result<String, ServiceError> {
        let repo = &self.repo;
        let slug = unique_slug(requested, title, "post", |candidate| async move {
            repo.slug_exists(&candidate, exclude_id).await
        })
        .await
        .context("Failed to check slug")?;
        Ok(slug)
    }

    async fn invalidate_home(&self) -> Result<(), ServiceError> {
        self.cache
            .delete_pattern(HOME_CACHE_PATTERN)
            .await
            .context("Failed to invalidate home cache")?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxPostRepository;
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::PostCategory;

    pub(crate) fn build_service(pool: &DynDatabasePool) -> PostService {
        PostService::new(
            SqlxPostRepository::boxed(pool.clone()),
            create_cache(&CacheConfig::default()),
        )
    }

    async fn setup() -> PostService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        build_service(&pool)
    }

    pub(crate) fn input(title: &str, published: bool) -> PostInput {
        PostInput {
            title: title.to_string(),
            content: "# Heading\n\nFirst paragraph with *emphasis*.".to_string(),
            is_published: published,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_renders_markdown_and_excerpt() {
        let service = setup().await;
        let post = service.create(Some(1), input("Hiring in 2026", true)).await.unwrap();

        assert_eq!(post.slug, "hiring-in-2026");
        assert!(post.content_html.contains("<h1>Heading</h1>"));
        assert!(post.content_html.contains("<em>emphasis</em>"));
        assert_eq!(post.excerpt.as_deref(), Some("Heading First paragraph with emphasis."));
        assert!(post.published_at.is_some());
    }

    #[tokio::test]
    async fn test_create_requires_title_and_content() {
        let service = setup().await;
        let err = service
            .create(None, PostInput { title: "x".to_string(), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(ref m) if m.contains("content")));
    }

    #[tokio::test]
    async fn test_drafts_are_hidden_until_published() {
        let service = setup().await;
        let draft = service.create(None, input("Draft", false)).await.unwrap();
        assert!(matches!(service.view(&draft.slug).await, Err(ServiceError::NotFound(_))));

        let published = service.toggle_published(draft.id).await.unwrap();
        assert!(published.is_published);
        let first_published_at = published.published_at.expect("published_at set");

        let viewed = service.view(&draft.slug).await.unwrap();
        assert_eq!(viewed.view_count, 1);

        // Unpublish and republish keeps the original timestamp
        service.toggle_published(draft.id).await.unwrap();
        let again = service.toggle_published(draft.id).await.unwrap();
        assert_eq!(again.published_at, Some(first_published_at));
    }

    #[tokio::test]
    async fn test_list_public_with_category() {
        let service = setup().await;
        service.create(None, input("Blog one", true)).await.unwrap();
        service
            .create(
                None,
                PostInput {
                    category: PostCategory::Activity,
                    ..input("Meetup", true)
                },
            )
            .await
            .unwrap();
        service.create(None, input("Hidden draft", false)).await.unwrap();

        let public = service.list(PostFilter::default(), PageParams::default()).await.unwrap();
        assert_eq!(public.total, 2);

        let activities = service
            .list(
                PostFilter {
                    category: Some(PostCategory::Activity),
                    ..PostFilter::default()
                },
                PageParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(activities.total, 1);
        assert_eq!(activities.items[0].title, "Meetup");

        let all = service
            .list(
                PostFilter {
                    published_only: false,
                    q: Some(" ".to_string()),
                    ..PostFilter::default()
                },
                PageParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(all.total, 3);
    }

    #[tokio::test]
    async fn test_update_keeps_counters_and_slug() {
        let service = setup().await;
        let post = service.create(None, input("Original", true)).await.unwrap();
        service.view(&post.slug).await.unwrap();

        let updated = service
            .update(
                post.id,
                PostInput {
                    excerpt: Some("Custom".to_string()),
                    ..input("Renamed", true)
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.slug, "original");
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.excerpt.as_deref(), Some("Custom"));
        assert_eq!(service.get_by_id(post.id).await.unwrap().view_count, 1);
    }
}
