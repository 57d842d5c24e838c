//! Back-office dashboard counters

use crate::db::repositories::{MentorRepository, UserRepository};
use crate::models::{
    BookingStatus, CommentStatus, MentorFilter, SubmissionStatus, UserRole,
};
use crate::services::booking::BookingService;
use crate::services::comment::CommentService;
use crate::services::error::ServiceError;
use crate::services::post::PostService;
use crate::services::submission::SubmissionService;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub total_users: i64,
    pub total_mentor_users: i64,
    pub total_mentors: i64,
    pub published_mentors: i64,
    pub total_posts: i64,
    pub published_posts: i64,
    pub pending_comments: i64,
    pub pending_submissions: i64,
    pub pending_bookings: i64,
    pub completed_bookings: i64,
}

pub struct DashboardService {
    users: Arc<dyn UserRepository>,
    mentors: Arc<dyn MentorRepository>,
    posts: Arc<PostService>,
    comments: Arc<CommentService>,
    submissions: Arc<SubmissionService>,
    bookings: Arc<BookingService>,
}

impl DashboardService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        mentors: Arc<dyn MentorRepository>,
        posts: Arc<PostService>,
        comments: Arc<CommentService>,
        submissions: Arc<SubmissionService>,
        bookings: Arc<BookingService>,
    ) -> Self {
        Self {
            users,
            mentors,
            posts,
            comments,
            submissions,
            bookings,
        }
    }

    pub async fn load(&self) -> Result<Dashboard, ServiceError> {
        let all_filter = MentorFilter {
            published_only: false,
            ..MentorFilter::default()
        };
        let published_filter = MentorFilter::default();

        let (
            total_users,
            total_mentor_users,
            total_mentors,
            published_mentors,
            total_posts,
            published_posts,
        ) = tokio::try_join!(
            count(self.users.count(), "users"),
            count(self.users.count_by_role(UserRole::Mentor), "mentor users"),
            count(self.mentors.count(&all_filter), "mentors"),
            count(self.mentors.count(&published_filter), "published mentors"),
            self.posts.count(false),
            self.posts.count(true),
        )?;

        let (pending_comments, pending_submissions, pending_bookings, completed_bookings) = tokio::try_join!(
            self.comments.count_by_status(CommentStatus::Pending),
            self.submissions.count_by_status(SubmissionStatus::Pending),
            self.bookings.count_by_status(BookingStatus::Pending),
            self.bookings.count_by_status(BookingStatus::Completed),
        )?;

        Ok(Dashboard {
            total_users,
            total_mentor_users,
            total_mentors,
            published_mentors,
            total_posts,
            published_posts,
            pending_comments,
            pending_submissions,
            pending_bookings,
            completed_bookings,
        })
    }
}

async fn count(
    fut: impl std::future::Future<Output = anyhow::Result<i64>>,
    what: &str,
) -> Result<i64, ServiceError> {
    Ok(fut.await.with_context(|| format!("Failed to count {}", what))?)
}
