//! Comment service
//!
//! Comments on published posts, moderated through `pending -> approved | hidden`.
//! The post's `comment_count` tracks approved comments only.

use crate::config::ModerationConfig;
use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{
    Comment, CommentStatus, CommentView, CreateCommentInput, PageParams, PagedResult, User,
};
use crate::services::error::{is_valid_email, ServiceError};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

/// Maximum comment length, in characters
pub const MAX_COMMENT_LENGTH: usize = 2000;

const MAX_AUTHOR_NAME_LENGTH: usize = 80;

/// Re-reads allowed when a concurrent moderator changes the row first
const MAX_TRANSITION_ATTEMPTS: usize = 3;

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
    moderation: ModerationConfig,
}

impl CommentService {
    pub fn new(
        repo: Arc<dyn CommentRepository>,
        posts: Arc<dyn PostRepository>,
        moderation: ModerationConfig,
    ) -> Self {
        Self {
            repo,
            posts,
            moderation,
        }
    }

    /// Add a comment to a published post
    ///
    /// Signed-in authors comment under their profile name. Guests must give a
    /// name, and are only accepted when guest comments are enabled.
    pub async fn create(
        &self,
        author: Option<&User>,
        input: CreateCommentInput,
    ) -> Result<CommentView, ServiceError> {
        let content = input.content.trim().to_string();
        if content.is_empty() {
            return Err(ServiceError::validation("content is required"));
        }
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(ServiceError::validation(format!(
                "content must be at most {} characters",
                MAX_COMMENT_LENGTH
            )));
        }

        let post = self
            .posts
            .get_by_id(input.post_id)
            .await
            .context("Failed to get post")?
            .filter(|p| p.is_published)
            .ok_or_else(|| ServiceError::not_found(format!("Post {}", input.post_id)))?;

        let (user_id, author_name, author_email) = match author {
            Some(user) => (Some(user.id), user.full_name.clone(), Some(user.email.clone())),
            None => {
                if !self.moderation.allow_guest_comments {
                    return Err(ServiceError::Forbidden(
                        "Sign in to comment".to_string(),
                    ));
                }
                let name = input.author_name.unwrap_or_default().trim().to_string();
                if name.is_empty() {
                    return Err(ServiceError::validation("author_name is required"));
                }
                if name.chars().count() > MAX_AUTHOR_NAME_LENGTH {
                    return Err(ServiceError::validation("author_name is too long"));
                }
                let email = input
                    .author_email
                    .map(|e| e.trim().to_lowercase())
                    .filter(|e| !e.is_empty());
                if let Some(ref e) = email {
                    if !is_valid_email(e) {
                        return Err(ServiceError::validation("Invalid email format"));
                    }
                }
                (None, name, email)
            }
        };

        let status = if self.moderation.auto_approve_comments {
            CommentStatus::Approved
        } else {
            CommentStatus::Pending
        };
        let now = Utc::now();
        let comment = Comment {
            id: 0,
            post_id: post.id,
            user_id,
            author_name,
            author_email,
            content,
            status,
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.create(&comment).await.context("Failed to create comment")?;
        if created.status == CommentStatus::Approved {
            self.posts
                .adjust_comment_count(post.id, 1)
                .await
                .context("Failed to update comment count")?;
        }

        tracing::debug!("Comment {} on post {} is {}", created.id, post.id, created.status);
        Ok(CommentView::new(created))
    }

    /// Approved comments on a post, oldest first
    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentView>, ServiceError> {
        let comments = self
            .repo
            .list_for_post(post_id, Some(CommentStatus::Approved))
            .await
            .context("Failed to list comments")?;
        Ok(comments.into_iter().map(CommentView::new).collect())
    }

    /// Moderation queue
    pub async fn list(
        &self,
        status: Option<CommentStatus>,
        params: PageParams,
    ) -> Result<PagedResult<CommentView>, ServiceError> {
        let (comments, total) = self
            .repo
            .list(status, params.limit(), params.offset())
            .await
            .context("Failed to list comments")?;
        Ok(PagedResult::new(comments, total, params).map(CommentView::new))
    }

    /// Change moderation status, keeping the post's approved count in step.
    ///
    /// The count only moves when this call wins the transition, so concurrent
    /// moderators cannot apply the same change twice.
    pub async fn update_status(
        &self,
        id: i64,
        status: CommentStatus,
    ) -> Result<CommentView, ServiceError> {
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let comment = self.require(id).await?;
            if comment.status == status {
                return Ok(CommentView::new(comment));
            }

            let moved = self
                .repo
                .update_status(id, comment.status, status)
                .await
                .context("Failed to update comment status")?;
            if !moved {
                continue;
            }

            let delta = approved_delta(comment.status, status);
            if delta != 0 {
                self.posts
                    .adjust_comment_count(comment.post_id, delta)
                    .await
                    .context("Failed to update comment count")?;
            }

            return Ok(CommentView::new(Comment {
                status,
                updated_at: Utc::now(),
                ..comment
            }));
        }
        Err(ServiceError::Conflict(format!(
            "Comment {} is being moderated concurrently",
            id
        )))
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let comment = self.require(id).await?;
            let deleted = self
                .repo
                .delete(id, comment.status)
                .await
                .context("Failed to delete comment")?;
            if !deleted {
                continue;
            }

            if comment.status == CommentStatus::Approved {
                self.posts
                    .adjust_comment_count(comment.post_id, -1)
                    .await
                    .context("Failed to update comment count")?;
            }
            return Ok(());
        }
        Err(ServiceError::Conflict(format!(
            "Comment {} is being moderated concurrently",
            id
        )))
    }

    pub async fn count_by_status(&self, status: CommentStatus) -> Result<i64, ServiceError> {
        Ok(self
            .repo
            .count_by_status(status)
            .await
            .context("Failed to count comments")?)
    }

    async fn require(&self, id: i64) -> Result<Comment, ServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get comment")?
            .ok_or_else(|| ServiceError::not_found(format!("Comment {}", id)))
    }
}

/// +1 when a comment becomes approved, -1 when it stops being approved
fn approved_delta(from: CommentStatus, to: CommentStatus) -> i64 {
    match (from == CommentStatus::Approved, to == CommentStatus::Approved) {
        (false, true) => 1,
        (true, false) => -1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::post::tests::test_post;
    use crate::db::repositories::user::tests::test_user;
    use crate::db::repositories::{
        SqlxCommentRepository, SqlxPostRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::UserRole;

    async fn setup(moderation: ModerationConfig) -> (CommentService, Arc<dyn PostRepository>, i64) {
        let (service, posts, post_id, _) = setup_with_pool(moderation).await;
        (service, posts, post_id)
    }

    async fn setup_with_pool(
        moderation: ModerationConfig,
    ) -> (CommentService, Arc<dyn PostRepository>, i64, DynDatabasePool) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        let posts = SqlxPostRepository::boxed(pool.clone());
        let post = posts.create(&test_post("hello", true)).await.unwrap();
        let service =
            CommentService::new(SqlxCommentRepository::boxed(pool.clone()), posts.clone(), moderation);
        (service, posts, post.id, pool)
    }

    fn guest(post_id: i64, name: Option<&str>, content: &str) -> CreateCommentInput {
        CreateCommentInput {
            post_id,
            author_name: name.map(str::to_string),
            content: content.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_guest_comment_is_pending() {
        let (service, _posts, post_id) = setup(ModerationConfig::default()).await;

        let view = service
            .create(None, guest(post_id, Some("Visitor"), "Great post"))
            .await
            .unwrap();
        assert_eq!(view.comment.status, CommentStatus::Pending);
        assert!(service.list_for_post(post_id).await.unwrap().is_empty());

        let missing_name = service.create(None, guest(post_id, Some("  "), "Hi")).await;
        assert!(matches!(missing_name, Err(ServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_content_length_bounds() {
        let (service, _posts, post_id) = setup(ModerationConfig::default()).await;

        let empty = service.create(None, guest(post_id, Some("V"), "   ")).await;
        assert!(matches!(empty, Err(ServiceError::ValidationError(_))));

        let max = "a".repeat(MAX_COMMENT_LENGTH);
        assert!(service.create(None, guest(post_id, Some("V"), &max)).await.is_ok());

        let too_long = "a".repeat(MAX_COMMENT_LENGTH + 1);
        let result = service.create(None, guest(post_id, Some("V"), &too_long)).await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_guests_rejected_when_disabled() {
        let moderation = ModerationConfig {
            allow_guest_comments: false,
            auto_approve_comments: true,
        };
        let (service, posts, post_id, pool) = setup_with_pool(moderation).await;

        let result = service.create(None, guest(post_id, Some("V"), "Hi")).await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));

        let member = SqlxUserRepository::new(pool)
            .create(&test_user("bo@example.com", UserRole::User))
            .await
            .unwrap();
        let view = service.create(Some(&member), guest(post_id, None, "Hi")).await.unwrap();
        assert_eq!(view.comment.author_name, "bo");
        assert_eq!(view.comment.status, CommentStatus::Approved);
        assert_eq!(posts.get_by_id(post_id).await.unwrap().unwrap().comment_count, 1);
    }

    #[tokio::test]
    async fn test_unpublished_post_rejects_comments() {
        let (service, posts, _) = setup(ModerationConfig::default()).await;
        let draft = posts.create(&test_post("draft", false)).await.unwrap();
        let result = service.create(None, guest(draft.id, Some("V"), "Hi")).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_status_changes_track_comment_count() {
        let (service, posts, post_id) = setup(ModerationConfig::default()).await;
        let view = service.create(None, guest(post_id, Some("V"), "Hi")).await.unwrap();
        let id = view.comment.id;
        let count = || async { posts.get_by_id(post_id).await.unwrap().unwrap().comment_count };

        service.update_status(id, CommentStatus::Approved).await.unwrap();
        assert_eq!(count().await, 1);
        assert_eq!(service.list_for_post(post_id).await.unwrap().len(), 1);

        // Same status twice is a no-op
        service.update_status(id, CommentStatus::Approved).await.unwrap();
        assert_eq!(count().await, 1);

        service.update_status(id, CommentStatus::Hidden).await.unwrap();
        assert_eq!(count().await, 0);

        service.update_status(id, CommentStatus::Approved).await.unwrap();
        service.delete(id).await.unwrap();
        assert_eq!(count().await, 0);
        assert!(matches!(service.delete(id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_approvals_count_once() {
        let (service, posts, post_id) = setup(ModerationConfig::default()).await;
        let id = service
            .create(None, guest(post_id, Some("V"), "Hi"))
            .await
            .unwrap()
            .comment
            .id;

        let (first, second) = tokio::join!(
            service.update_status(id, CommentStatus::Approved),
            service.update_status(id, CommentStatus::Approved)
        );
        assert_eq!(first.unwrap().comment.status, CommentStatus::Approved);
        assert_eq!(second.unwrap().comment.status, CommentStatus::Approved);
        assert_eq!(posts.get_by_id(post_id).await.unwrap().unwrap().comment_count, 1);

        let (first, second) = tokio::join!(service.delete(id), service.delete(id));
        assert!(first.is_ok() != second.is_ok());
        assert_eq!(posts.get_by_id(post_id).await.unwrap().unwrap().comment_count, 0);
    }

    #[tokio::test]
    async fn test_moderation_queue() {
        let (service, _posts, post_id) = setup(ModerationConfig::default()).await;
        for i in 0..3 {
            service
                .create(None, guest(post_id, Some("V"), &format!("Comment {}", i)))
                .await
                .unwrap();
        }
        let pending = service
            .list(Some(CommentStatus::Pending), PageParams::new(1, 2))
            .await
            .unwrap();
        assert_eq!(pending.total, 3);
        assert_eq!(pending.items.len(), 2);
        assert_eq!(service.count_by_status(CommentStatus::Pending).await.unwrap(), 3);
    }

    #[test]
    fn test_approved_delta() {
        use CommentStatus::*;
        assert_eq!(approved_delta(Pending, Approved), 1);
        assert_eq!(approved_delta(Approved, Hidden), -1);
        assert_eq!(approved_delta(Pending, Hidden), 0);
        assert_eq!(approved_delta(Approved, Approved), 0);
    }
}
