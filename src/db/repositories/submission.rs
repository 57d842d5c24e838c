//! Mentor submission repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{with_pool, DynDatabasePool, LastInsertId};
use crate::models::{MentorSubmission, SubmissionStatus};

const SUBMISSION_COLUMNS: &str = "id, user_id, full_name, email, phone, title, company, bio, skills, \
                                  linkedin_url, avatar_url, years_experience, status, review_note, \
                                  reviewed_by, reviewed_at, mentor_id, created_at, updated_at";

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn create(&self, submission: &MentorSubmission) -> Result<MentorSubmission>;

    async fn get_by_id(&self, id: i64) -> Result<Option<MentorSubmission>>;

    /// Newest first, with the unpaged total
    async fn list(
        &self,
        status: Option<SubmissionStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<MentorSubmission>, i64)>;

    /// Record a review decision. Only rows still pending are changed;
    /// returns false when the submission was already reviewed.
    async fn mark_reviewed(
        &self,
        id: i64,
        status: SubmissionStatus,
        reviewer_id: i64,
        note: Option<&str>,
        mentor_id: Option<i64>,
    ) -> Result<bool>;

    async fn count_by_status(&self, status: SubmissionStatus) -> Result<i64>;
}

pub struct SqlxSubmissionRepository {
    pool: DynDatabasePool,
}

impl SqlxSubmissionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubmissionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SubmissionRepository for SqlxSubmissionRepository {
    async fn create(&self, submission: &MentorSubmission) -> Result<MentorSubmission> {
        let now = Utc::now();
        let id = with_pool!(self.pool, |p| {
            sqlx::query(
                r#"
                INSERT INTO mentor_submissions (user_id, full_name, email, phone, title, company, bio,
                                                skills, linkedin_url, avatar_url, years_experience,
                                                status, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(submission.user_id)
            .bind(&submission.full_name)
            .bind(&submission.email)
            .bind(&submission.phone)
            .bind(&submission.title)
            .bind(&submission.company)
            .bind(&submission.bio)
            .bind(&submission.skills)
            .bind(&submission.linkedin_url)
            .bind(&submission.avatar_url)
            .bind(submission.years_experience)
            .bind(SubmissionStatus::Pending.as_str())
            .bind(now)
            .bind(now)
            .execute(p)
            .await
            .context("Failed to create submission")?
            .last_id()
        });

        Ok(MentorSubmission {
            id,
            status: SubmissionStatus::Pending,
            review_note: None,
            reviewed_by: None,
            reviewed_at: None,
            mentor_id: None,
            created_at: now,
            updated_at: now,
            ..submission.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<MentorSubmission>> {
        let sql = format!(
            "SELECT {} FROM mentor_submissions WHERE id = ?",
            SUBMISSION_COLUMNS
        );
        with_pool!(self.pool, |p| {
            sqlx::query_as::<_, MentorSubmission>(&sql)
                .bind(id)
                .fetch_optional(p)
                .await
                .context("Failed to get submission")
        })
    }

    async fn list(
        &self,
        status: Option<SubmissionStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<MentorSubmission>, i64)> {
        let sql = format!(
            "SELECT {} FROM mentor_submissions WHERE (? IS NULL OR status = ?) \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            SUBMISSION_COLUMNS
        );
        let status = status.map(|s| s.as_str());
        with_pool!(self.pool, |p| {
            let items = sqlx::query_as::<_, MentorSubmission>(&sql)
                .bind(status)
                .bind(status)
                .bind(limit)
                .bind(offset.max(0))
                .fetch_all(p)
                .await
                .context("Failed to list submissions")?;
            let total = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM mentor_submissions WHERE (? IS NULL OR status = ?)",
            )
            .bind(status)
            .bind(status)
            .fetch_one(p)
            .await
            .context("Failed to count submissions")?;
            Ok((items, total))
        })
    }

    async fn mark_reviewed(
        &self,
        id: i64,
        status: SubmissionStatus,
        reviewer_id: i64,
        note: Option<&str>,
        mentor_id: Option<i64>,
    ) -> Result<bool> {
        let now = Utc::now();
        with_pool!(self.pool, |p| {
            let result = sqlx::query(
                r#"
                UPDATE mentor_submissions
                SET status = ?, reviewed_by = ?, review_note = ?, reviewed_at = ?, mentor_id = ?,
                    updated_at = ?
                WHERE id = ? AND status = ?
                "#,
            )
            .bind(status.as_str())
            .bind(reviewer_id)
            .bind(note)
            .bind(now)
            .bind(mentor_id)
            .bind(now)
            .bind(id)
            .bind(SubmissionStatus::Pending.as_str())
            .execute(p)
            .await
            .context("Failed to review submission")?;
            Ok(result.rows_affected() > 0)
        })
    }

    async fn count_by_status(&self, status: SubmissionStatus) -> Result<i64> {
        with_pool!(self.pool, |p| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM mentor_submissions WHERE status = ?")
                .bind(status.as_str())
                .fetch_one(p)
                .await
                .context("Failed to count submissions")
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::repositories::user::tests::{setup_test_repo as setup_users, test_user};
    use crate::db::repositories::UserRepository;
    use crate::models::UserRole;

    pub(crate) fn test_submission(email: &str) -> MentorSubmission {
        let now = Utc::now();
        MentorSubmission {
            id: 0,
            user_id: None,
            full_name: "Ana Tran".to_string(),
            email: email.to_string(),
            phone: None,
            title: "Recruiter".to_string(),
            company: None,
            bio: "Ten years in tech hiring.".to_string(),
            skills: "Hiring,Interviewing".to_string(),
            linkedin_url: None,
            avatar_url: None,
            years_experience: 10,
            status: SubmissionStatus::Pending,
            review_note: None,
            reviewed_by: None,
            reviewed_at: None,
            mentor_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_list_and_review() {
        let (pool, users) = setup_users().await;
        let admin = users.create(&test_user("admin@example.com", UserRole::Admin)).await.unwrap();
        let repo = SqlxSubmissionRepository::new(pool);

        let first = repo.create(&test_submission("ana@example.com")).await.unwrap();
        repo.create(&test_submission("bo@example.com")).await.unwrap();

        let stored = repo.get_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(stored.skill_list(), vec!["Hiring", "Interviewing"]);

        let (pending, total) = repo.list(Some(SubmissionStatus::Pending), 10, 0).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(pending.len(), 2);

        assert!(repo
            .mark_reviewed(first.id, SubmissionStatus::Rejected, admin.id, Some("Incomplete"), None)
            .await
            .unwrap());
        // Already reviewed
        assert!(!repo
            .mark_reviewed(first.id, SubmissionStatus::Approved, admin.id, None, None)
            .await
            .unwrap());

        let reviewed = repo.get_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(reviewed.status, SubmissionStatus::Rejected);
        assert_eq!(reviewed.reviewed_by, Some(admin.id));
        assert_eq!(reviewed.review_note.as_deref(), Some("Incomplete"));
        assert!(reviewed.reviewed_at.is_some());

        assert_eq!(repo.count_by_status(SubmissionStatus::Pending).await.unwrap(), 1);
    }
}
