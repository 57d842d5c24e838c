//! Booking service
//!
//! Users request sessions with published mentors. The mentor (or an admin)
//! confirms and completes them; either side may cancel while open.

use crate::db::repositories::{BookingRepository, BookingScope, MentorRepository};
use crate::models::{
    Booking, BookingStatus, BookingView, CreateBookingInput, PageParams, PagedResult, User,
};
use crate::services::email::{EmailError, EmailService};
use crate::services::error::ServiceError;
use anyhow::Context;
use chrono::Utc;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Accepted session lengths, in minutes
pub const DURATION_RANGE: RangeInclusive<i32> = 15..=240;

const MAX_TOPIC_LENGTH: usize = 200;

pub struct BookingService {
    repo: Arc<dyn BookingRepository>,
    mentors: Arc<dyn MentorRepository>,
    email: Arc<EmailService>,
}

impl BookingService {
    pub fn new(
        repo: Arc<dyn BookingRepository>,
        mentors: Arc<dyn MentorRepository>,
        email: Arc<EmailService>,
    ) -> Self {
        Self {
            repo,
            mentors,
            email,
        }
    }

    pub async fn create(
        &self,
        user: &User,
        input: CreateBookingInput,
    ) -> Result<Booking, ServiceError> {
        let topic = input.topic.trim().to_string();
        if topic.is_empty() {
            return Err(ServiceError::validation("topic is required"));
        }
        if topic.chars().count() > MAX_TOPIC_LENGTH {
            return Err(ServiceError::validation(format!(
                "topic must be at most {} characters",
                MAX_TOPIC_LENGTH
            )));
        }
        if !DURATION_RANGE.contains(&input.duration_minutes) {
            return Err(ServiceError::validation(format!(
                "duration_minutes must be between {} and {}",
                DURATION_RANGE.start(),
                DURATION_RANGE.end()
            )));
        }
        let now = Utc::now();
        if input.scheduled_at <= now {
            return Err(ServiceError::validation("scheduled_at must be in the future"));
        }

        let mentor = self
            .mentors
            .get_by_id(input.mentor_id)
            .await
            .context("Failed to get mentor")?
            .filter(|m| m.is_published)
            .ok_or_else(|| ServiceError::not_found(format!("Mentor {}", input.mentor_id)))?;
        if user.mentor_id == Some(mentor.id) {
            return Err(ServiceError::validation("You cannot book your own mentor profile"));
        }

        let booking = Booking {
            id: 0,
            mentor_id: mentor.id,
            user_id: user.id,
            scheduled_at: input.scheduled_at,
            duration_minutes: input.duration_minutes,
            topic,
            note: input.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let created = self.repo.create(&booking).await.context("Failed to create booking")?;
        tracing::info!(
            "Booking {} requested by user {} with mentor {}",
            created.id,
            user.id,
            mentor.id
        );

        if let Some(to) = mentor.email.filter(|e| !e.is_empty()) {
            let email = self.email.clone();
            let (mentor_name, user_name, topic) =
                (mentor.full_name, user.full_name.clone(), created.topic.clone());
            tokio::spawn(async move {
                match email.send_booking_request(&to, &mentor_name, &user_name, &topic).await {
                    Ok(()) => {}
                    Err(EmailError::MailDisabled) => {
                        tracing::debug!("Mail disabled; booking notice to {} skipped", to)
                    }
                    Err(e) => tracing::warn!("Failed to send booking notice to {}: {}", to, e),
                }
            });
        }

        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Booking, ServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get booking")?
            .ok_or_else(|| ServiceError::not_found(format!("Booking {}", id)))
    }

    /// Bookings the user requested
    pub async fn list_mine(
        &self,
        user: &User,
        status: Option<BookingStatus>,
        params: PageParams,
    ) -> Result<PagedResult<BookingView>, ServiceError> {
        self.list(BookingScope::User(user.id), status, params).await
    }

    /// Bookings for the mentor record linked to `user`
    pub async fn list_for_mentor(
        &self,
        user: &User,
        status: Option<BookingStatus>,
        params: PageParams,
    ) -> Result<PagedResult<BookingView>, ServiceError> {
        let mentor_id = user
            .mentor_id
            .filter(|id| user.manages_mentor(*id))
            .ok_or_else(|| {
                ServiceError::Forbidden("Your profile is not linked to a mentor".to_string())
            })?;
        self.list(BookingScope::Mentor(mentor_id), status, params).await
    }

    /// Every booking, for the back office
    pub async fn list_all(
        &self,
        status: Option<BookingStatus>,
        params: PageParams,
    ) -> Result<PagedResult<BookingView>, ServiceError> {
        self.list(BookingScope::All, status, params).await
    }

    /// Move a booking along its lifecycle
    ///
    /// The requesting user may only cancel. The linked mentor may confirm,
    /// complete or cancel. Admins may apply any valid transition.
    pub async fn update_status(
        &self,
        actor: &User,
        id: i64,
        to: BookingStatus,
    ) -> Result<Booking, ServiceError> {
        let booking = self.get_by_id(id).await?;
        if !may_apply(actor, &booking, to) {
            return Err(ServiceError::Forbidden(format!(
                "You cannot mark this booking {}",
                to
            )));
        }
        if !booking.status.can_transition_to(to) {
            return Err(ServiceError::Conflict(format!(
                "Booking is {} and cannot become {}",
                booking.status, to
            )));
        }
        if !self
            .repo
            .update_status(id, booking.status, to)
            .await
            .context("Failed to update booking")?
        {
            return Err(ServiceError::Conflict(format!(
                "Booking {} changed while updating",
                id
            )));
        }

        tracing::info!("Booking {} {} -> {} by user {}", id, booking.status, to, actor.id);
        Ok(Booking {
            status: to,
            updated_at: Utc::now(),
            ..booking
        })
    }

    pub async fn count_by_status(&self, status: BookingStatus) -> Result<i64, ServiceError> {
        Ok(self
            .repo
            .count_by_status(status)
            .await
            .context("Failed to count bookings")?)
    }

    async fn list(
        &self,
        scope: BookingScope,
        status: Option<BookingStatus>,
        params: PageParams,
    ) -> Result<PagedResult<BookingView>, ServiceError> {
        let (items, total) = self
            .repo
            .list(scope, status, params.limit(), params.offset())
            .await
            .context("Failed to list bookings")?;
        Ok(PagedResult::new(items, total, params))
    }
}

fn may_apply(actor: &User, booking: &Booking, to: BookingStatus) -> bool {
    if actor.is_admin() {
        return true;
    }
    if actor.manages_mentor(booking.mentor_id) {
        return matches!(
            to,
            BookingStatus::Confirmed | BookingStatus::Completed | BookingStatus::Cancelled
        );
    }
    actor.id == booking.user_id && to == BookingStatus::Cancelled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MailConfig;
    use crate::db::repositories::mentor::tests::test_mentor;
    use crate::db::repositories::user::tests::test_user;
    use crate::db::repositories::{
        SqlxBookingRepository, SqlxMentorRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Mentor, UserRole};
    use chrono::Duration;

    struct Fixture {
        service: BookingService,
        mentor: Mentor,
        member: User,
        mentor_user: User,
        admin: User,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        let mentors = SqlxMentorRepository::boxed(pool.clone());
        let users = SqlxUserRepository::boxed(pool.clone());

        let mentor = mentors.create(&test_mentor("ana", "Ana", true)).await.unwrap();
        let member = users.create(&test_user("bo@example.com", UserRole::User)).await.unwrap();
        let admin = users.create(&test_user("root@example.com", UserRole::Admin)).await.unwrap();
        let mut ana = test_user("ana@example.com", UserRole::Mentor);
        ana.mentor_id = Some(mentor.id);
        let mentor_user = users.create(&ana).await.unwrap();

        let service = BookingService::new(
            SqlxBookingRepository::boxed(pool),
            mentors,
            Arc::new(EmailService::new(MailConfig::default())),
        );
        Fixture {
            service,
            mentor,
            member,
            mentor_user,
            admin,
        }
    }

    fn request(mentor_id: i64) -> CreateBookingInput {
        CreateBookingInput {
            mentor_id,
            scheduled_at: Utc::now() + Duration::days(2),
            duration_minutes: 60,
            topic: "Salary negotiation".to_string(),
            note: Some("  ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_validates_request() {
        let f = setup().await;

        let past = CreateBookingInput {
            scheduled_at: Utc::now() - Duration::hours(1),
            ..request(f.mentor.id)
        };
        assert!(matches!(
            f.service.create(&f.member, past).await,
            Err(ServiceError::ValidationError(_))
        ));

        for minutes in [10, 241] {
            let input = CreateBookingInput {
                duration_minutes: minutes,
                ..request(f.mentor.id)
            };
            assert!(matches!(
                f.service.create(&f.member, input).await,
                Err(ServiceError::ValidationError(_))
            ));
        }

        let blank = CreateBookingInput {
            topic: " ".to_string(),
            ..request(f.mentor.id)
        };
        assert!(f.service.create(&f.member, blank).await.is_err());

        assert!(matches!(
            f.service.create(&f.member, request(9999)).await,
            Err(ServiceError::NotFound(_))
        ));

        let created = f.service.create(&f.member, request(f.mentor.id)).await.unwrap();
        assert_eq!(created.status, BookingStatus::Pending);
        assert!(created.note.is_none());
    }

    #[tokio::test]
    async fn test_mentor_cannot_book_self() {
        let f = setup().await;
        let result = f.service.create(&f.mentor_user, request(f.mentor.id)).await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_role_rules_for_transitions() {
        let f = setup().await;
        let booking = f.service.create(&f.member, request(f.mentor.id)).await.unwrap();

        // The requester cannot confirm their own booking
        assert!(matches!(
            f.service.update_status(&f.member, booking.id, BookingStatus::Confirmed).await,
            Err(ServiceError::Forbidden(_))
        ));

        let confirmed = f
            .service
            .update_status(&f.mentor_user, booking.id, BookingStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);

        // Pending is not reachable again
        assert!(matches!(
            f.service.update_status(&f.admin, booking.id, BookingStatus::Pending).await,
            Err(ServiceError::Conflict(_))
        ));

        f.service
            .update_status(&f.mentor_user, booking.id, BookingStatus::Completed)
            .await
            .unwrap();
        assert!(matches!(
            f.service.update_status(&f.member, booking.id, BookingStatus::Cancelled).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_requester_can_cancel() {
        let f = setup().await;
        let booking = f.service.create(&f.member, request(f.mentor.id)).await.unwrap();
        let cancelled = f
            .service
            .update_status(&f.member, booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(f.service.count_by_status(BookingStatus::Cancelled).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_listings_by_scope() {
        let f = setup().await;
        f.service.create(&f.member, request(f.mentor.id)).await.unwrap();

        let mine = f.service.list_mine(&f.member, None, PageParams::default()).await.unwrap();
        assert_eq!(mine.total, 1);
        assert_eq!(mine.items[0].mentor_name, "Ana");

        let inbox = f
            .service
            .list_for_mentor(&f.mentor_user, Some(BookingStatus::Pending), PageParams::default())
            .await
            .unwrap();
        assert_eq!(inbox.total, 1);

        assert!(matches!(
            f.service.list_for_mentor(&f.member, None, PageParams::default()).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert_eq!(f.service.list_all(None, PageParams::default()).await.unwrap().total, 1);
    }
}
