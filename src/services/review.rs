//! Review service
//!
//! One review per user per mentor, allowed after a completed session. The
//! mentor row keeps the rating total and count of visible reviews.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::{BookingRepository, MentorRepository, ReviewRepository};
use crate::models::{CreateReviewInput, PageParams, PagedResult, Review, ReviewView, User};
use crate::services::error::ServiceError;
use crate::services::home::HOME_CACHE_PATTERN;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;

const MAX_REVIEW_LENGTH: usize = 2000;

/// Re-reads allowed when visibility flips between the read and the delete
const MAX_DELETE_ATTEMPTS: usize = 3;

pub struct ReviewService {
    repo: Arc<dyn ReviewRepository>,
    mentors: Arc<dyn MentorRepository>,
    bookings: Arc<dyn BookingRepository>,
    cache: Arc<Cache>,
}

impl ReviewService {
    pub fn new(
        repo: Arc<dyn ReviewRepository>,
        mentors: Arc<dyn MentorRepository>,
        bookings: Arc<dyn BookingRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            repo,
            mentors,
            bookings,
            cache,
        }
    }

    pub async fn create(
        &self,
        author: &User,
        mentor_id: i64,
        input: CreateReviewInput,
    ) -> Result<Review, ServiceError> {
        if !(1..=5).contains(&input.rating) {
            return Err(ServiceError::validation("rating must be between 1 and 5"));
        }
        let content = input.content.trim().to_string();
        if content.chars().count() > MAX_REVIEW_LENGTH {
            return Err(ServiceError::validation(format!(
                "content must be at most {} characters",
                MAX_REVIEW_LENGTH
            )));
        }

        self.mentors
            .get_by_id(mentor_id)
            .await
            .context("Failed to get mentor")?
            .filter(|m| m.is_published)
            .ok_or_else(|| ServiceError::not_found(format!("Mentor {}", mentor_id)))?;

        if self
            .repo
            .find_by_author(mentor_id, author.id)
            .await
            .context("Failed to look up review")?
            .is_some()
        {
            return Err(ServiceError::Conflict(
                "You have already reviewed this mentor".to_string(),
            ));
        }
        if !author.is_admin()
            && !self
                .bookings
                .has_completed(author.id, mentor_id)
                .await
                .context("Failed to check bookings")?
        {
            return Err(ServiceError::Forbidden(
                "Reviews require a completed session with this mentor".to_string(),
            ));
        }

        let review = Review {
            id: 0,
            mentor_id,
            user_id: author.id,
            rating: input.rating,
            content,
            is_visible: true,
            created_at: Utc::now(),
        };
        let created = self.repo.create(&review).await.context("Failed to create review")?;
        self.adjust(mentor_id, created.rating as i64, 1).await?;

        tracing::info!("Review {} for mentor {} by user {}", created.id, mentor_id, author.id);
        Ok(created)
    }

    /// Visible reviews for a mentor, newest first
    pub async fn list_for_mentor(
        &self,
        mentor_id: i64,
        params: PageParams,
    ) -> Result<PagedResult<ReviewView>, ServiceError> {
        let (items, total) = self
            .repo
            .list_for_mentor(mentor_id, true, params.limit(), params.offset())
            .await
            .context("Failed to list reviews")?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Hide or show a review, moving its rating in or out of the aggregate.
    /// Only the caller that actually flips the flag touches the aggregate.
    pub async fn set_visible(&self, id: i64, visible: bool) -> Result<Review, ServiceError> {
        let review = self.require(id).await?;
        if review.is_visible == visible {
            return Ok(review);
        }
        let flipped = self
            .repo
            .set_visible(id, visible)
            .await
            .context("Failed to update review")?;
        if !flipped {
            // Lost to a concurrent change; report what is stored now
            return self.require(id).await;
        }

        let sign = if visible { 1 } else { -1 };
        self.adjust(review.mentor_id, sign * review.rating as i64, sign).await?;
        Ok(Review {
            is_visible: visible,
            ..review
        })
    }

    pub async fn delete(&self, id: i64) -> Result<(), ServiceError> {
        for _ in 0..MAX_DELETE_ATTEMPTS {
            let review = self.require(id).await?;
            let deleted = self
                .repo
                .delete(id, review.is_visible)
                .await
                .context("Failed to delete review")?;
            if !deleted {
                continue;
            }
            if review.is_visible {
                self.adjust(review.mentor_id, -(review.rating as i64), -1).await?;
            }
            return Ok(());
        }
        Err(ServiceError::Conflict(format!(
            "Review {} is being moderated concurrently",
            id
        )))
    }

    async fn require(&self, id: i64) -> Result<Review, ServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get review")?
            .ok_or_else(|| ServiceError::not_found(format!("Review {}", id)))
    }

    async fn adjust(&self, mentor_id: i64, delta_total: i64, delta_count: i64) -> Result<(), ServiceError> {
        self.mentors
            .adjust_rating(mentor_id, delta_total, delta_count)
            .await
            .context("Failed to update rating")?;
        // Featured cards on the home page show ratings
        self.cache
            .delete_pattern(HOME_CACHE_PATTERN)
            .await
            .context("Failed to invalidate home cache")?;
        Ok(())
    }
}
