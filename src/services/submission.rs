//! Mentor registration submissions
//!
//! Visitors apply to become mentors; admins approve or reject. Approval
//! creates an unpublished mentor from the submission and links the
//! submitting profile to it.

use crate::db::repositories::{SubmissionRepository, UserRepository};
use crate::models::{
    MentorInput, MentorSubmission, MentorWithSkills, PageParams, PagedResult, SubmissionInput,
    SubmissionStatus, User, UserRole,
};
use crate::services::error::{is_valid_email, require_fields, ServiceError};
use crate::services::mentor::{normalize_skills, MentorService};
use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Result of approving a submission
#[derive(Debug, Clone, Serialize)]
pub struct Approval {
    pub submission: MentorSubmission,
    pub mentor: MentorWithSkills,
}

pub struct SubmissionService {
    repo: Arc<dyn SubmissionRepository>,
    users: Arc<dyn UserRepository>,
    mentors: Arc<MentorService>,
}

impl SubmissionService {
    pub fn new(
        repo: Arc<dyn SubmissionRepository>,
        users: Arc<dyn UserRepository>,
        mentors: Arc<MentorService>,
    ) -> Self {
        Self {
            repo,
            users,
            mentors,
        }
    }

    /// Record a new application. Signed-in applicants are linked by user id.
    pub async fn create(
        &self,
        applicant: Option<&User>,
        input: SubmissionInput,
    ) -> Result<MentorSubmission, ServiceError> {
        require_fields(&[
            ("full_name", &input.full_name),
            ("email", &input.email),
            ("title", &input.title),
            ("bio", &input.bio),
        ])?;
        let email = input.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(ServiceError::validation("Invalid email format"));
        }
        if input.years_experience < 0 {
            return Err(ServiceError::validation("years_experience cannot be negative"));
        }

        // Stored comma separated, so commas inside a name become spaces
        let skills = normalize_skills(input.skills.into_iter().map(|s| s.replace(',', " ")).collect());

        let now = Utc::now();
        let submission = MentorSubmission {
            id: 0,
            user_id: applicant.map(|u| u.id),
            full_name: input.full_name.trim().to_string(),
            email,
            phone: optional(input.phone),
            title: input.title.trim().to_string(),
            company: optional(input.company),
            bio: input.bio.trim().to_string(),
            skills: skills.join(","),
            linkedin_url: optional(input.linkedin_url),
            avatar_url: optional(input.avatar_url),
            years_experience: input.years_experience,
            status: SubmissionStatus::Pending,
            review_note: None,
            reviewed_by: None,
            reviewed_at: None,
            mentor_id: None,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .repo
            .create(&submission)
            .await
            .context("Failed to create submission")?;
        tracing::info!("New mentor submission {} from {}", created.id, created.email);
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<MentorSubmission, ServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get submission")?
            .ok_or_else(|| ServiceError::not_found(format!("Submission {}", id)))
    }

    pub async fn list(
        &self,
        status: Option<SubmissionStatus>,
        params: PageParams,
    ) -> Result<PagedResult<MentorSubmission>, ServiceError> {
        let (items, total) = self
            .repo
            .list(status, params.limit(), params.offset())
            .await
            .context("Failed to list submissions")?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Approve a pending submission
    ///
    /// Creates an unpublished mentor with the submitted skills. When the
    /// applicant has a profile it is linked to the mentor and, unless it is
    /// an admin, given the `mentor` role.
    pub async fn approve(
        &self,
        id: i64,
        reviewer: &User,
        note: Option<String>,
    ) -> Result<Approval, ServiceError> {
        let submission = self.require_pending(id).await?;

        let mentor = self
            .mentors
            .create(MentorInput {
                slug: None,
                full_name: submission.full_name.clone(),
                title: submission.title.clone(),
                company: submission.company.clone(),
                bio: submission.bio.clone(),
                avatar_url: submission.avatar_url.clone(),
                email: Some(submission.email.clone()),
                linkedin_url: submission.linkedin_url.clone(),
                location: None,
                years_experience: submission.years_experience,
                is_published: false,
                is_featured: false,
                sort_order: 0,
                skills: Some(submission.skill_list()),
            })
            .await?;

        let note = note.and_then(|n| optional(Some(n)));
        let marked = self
            .repo
            .mark_reviewed(
                id,
                SubmissionStatus::Approved,
                reviewer.id,
                note.as_deref(),
                Some(mentor.mentor.id),
            )
            .await
            .context("Failed to mark submission approved")?;
        if !marked {
            // Reviewed concurrently; drop the mentor created above
            self.mentors.delete(mentor.mentor.id).await?;
            return Err(ServiceError::Conflict(format!(
                "Submission {} was already reviewed",
                id
            )));
        }

        if let Some(user_id) = submission.user_id {
            self.link_applicant(user_id, mentor.mentor.id).await?;
        }

        tracing::info!(
            "Submission {} approved by {}; mentor {} created",
            id,
            reviewer.id,
            mentor.mentor.id
        );
        Ok(Approval {
            submission: self.get_by_id(id).await?,
            mentor,
        })
    }

    pub async fn reject(
        &self,
        id: i64,
        reviewer: &User,
        note: Option<String>,
    ) -> Result<MentorSubmission, ServiceError> {
        self.require_pending(id).await?;
        let note = note.and_then(|n| optional(Some(n)));
        let marked = self
            .repo
            .mark_reviewed(id, SubmissionStatus::Rejected, reviewer.id, note.as_deref(), None)
            .await
            .context("Failed to mark submission rejected")?;
        if !marked {
            return Err(ServiceError::Conflict(format!(
                "Submission {} was already reviewed",
                id
            )));
        }
        tracing::info!("Submission {} rejected by {}", id, reviewer.id);
        self.get_by_id(id).await
    }

    pub async fn count_by_status(&self, status: SubmissionStatus) -> Result<i64, ServiceError> {
        Ok(self
            .repo
            .count_by_status(status)
            .await
            .context("Failed to count submissions")?)
    }

    async fn require_pending(&self, id: i64) -> Result<MentorSubmission, ServiceError> {
        let submission = self.get_by_id(id).await?;
        if submission.status != SubmissionStatus::Pending {
            return Err(ServiceError::Conflict(format!(
                "Submission {} is already {}",
                id, submission.status
            )));
        }
        Ok(submission)
    }

    async fn link_applicant(&self, user_id: i64, mentor_id: i64) -> Result<(), ServiceError> {
        let user = match self.users.get_by_id(user_id).await.context("Failed to get user")? {
            Some(user) => user,
            None => {
                tracing::warn!("Applicant {} no longer exists; mentor {} left unlinked", user_id, mentor_id);
                return Ok(());
            }
        };
        let role = if user.role == UserRole::Admin {
            UserRole::Admin
        } else {
            UserRole::Mentor
        };
        self.users
            .update(&User {
                mentor_id: Some(mentor_id),
                role,
                ..user
            })
            .await
            .context("Failed to link applicant")?;
        Ok(())
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::user::tests::test_user;
    use crate::db::repositories::{SqlxSubmissionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};

    struct Fixture {
        service: SubmissionService,
        users: Arc<dyn UserRepository>,
        admin: User,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        let users = SqlxUserRepository::boxed(pool.clone());
        let admin = users
            .create(&test_user("admin@example.com", UserRole::Admin))
            .await
            .unwrap();
        let mentors = Arc::new(crate::services::mentor::tests::build_service(
            &pool,
            create_cache(&CacheConfig::default()),
        ));
        let service = SubmissionService::new(
            SqlxSubmissionRepository::boxed(pool),
            users.clone(),
            mentors,
        );
        Fixture {
            service,
            users,
            admin,
        }
    }

    fn input() -> SubmissionInput {
        SubmissionInput {
            full_name: "Ana Tran".to_string(),
            email: "Ana@Example.com".to_string(),
            title: "Recruiter".to_string(),
            bio: "Ten years of hiring.".to_string(),
            skills: vec!["Hiring".to_string(), "hiring".to_string(), "CV, review".to_string()],
            years_experience: 10,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_validates_required_fields() {
        let f = setup().await;

        let missing_bio = SubmissionInput {
            bio: " ".to_string(),
            ..input()
        };
        let err = f.service.create(None, missing_bio).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(ref m) if m.contains("bio")));

        let bad_email = SubmissionInput {
            email: "ana".to_string(),
            ..input()
        };
        assert!(matches!(
            f.service.create(None, bad_email).await,
            Err(ServiceError::ValidationError(_))
        ));

        let created = f.service.create(None, input()).await.unwrap();
        assert_eq!(created.email, "ana@example.com");
        assert_eq!(created.skill_list(), vec!["Hiring", "CV  review"]);
        assert_eq!(created.status, SubmissionStatus::Pending);
    }

    #[tokio::test]
    async fn test_approve_creates_unpublished_mentor_and_links_profile() {
        let f = setup().await;
        let applicant = f
            .users
            .create(&test_user("ana@example.com", UserRole::User))
            .await
            .unwrap();
        let submission = f.service.create(Some(&applicant), input()).await.unwrap();

        let approval = f
            .service
            .approve(submission.id, &f.admin, Some("Welcome".to_string()))
            .await
            .unwrap();
        assert!(!approval.mentor.mentor.is_published);
        assert_eq!(approval.mentor.mentor.full_name, "Ana Tran");
        assert_eq!(approval.mentor.skills, vec!["Hiring", "CV  review"]);
        assert_eq!(approval.submission.status, SubmissionStatus::Approved);
        assert_eq!(approval.submission.mentor_id, Some(approval.mentor.mentor.id));
        assert_eq!(approval.submission.review_note.as_deref(), Some("Welcome"));

        let linked = f.users.get_by_id(applicant.id).await.unwrap().unwrap();
        assert_eq!(linked.role, UserRole::Mentor);
        assert_eq!(linked.mentor_id, Some(approval.mentor.mentor.id));
    }

    #[tokio::test]
    async fn test_only_pending_can_be_reviewed() {
        let f = setup().await;
        let submission = f.service.create(None, input()).await.unwrap();

        let rejected = f.service.reject(submission.id, &f.admin, None).await.unwrap();
        assert_eq!(rejected.status, SubmissionStatus::Rejected);
        assert_eq!(rejected.reviewed_by, Some(f.admin.id));

        assert!(matches!(
            f.service.approve(submission.id, &f.admin, None).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            f.service.reject(submission.id, &f.admin, None).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(
            f.service.approve(9999, &f.admin, None).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let f = setup().await;
        let first = f.service.create(None, input()).await.unwrap();
        f.service.create(None, input()).await.unwrap();
        f.service.reject(first.id, &f.admin, None).await.unwrap();

        let pending = f
            .service
            .list(Some(SubmissionStatus::Pending), PageParams::default())
            .await
            .unwrap();
        assert_eq!(pending.total, 1);
        assert_eq!(f.service.count_by_status(SubmissionStatus::Rejected).await.unwrap(), 1);
    }
}
