//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for one aggregate.

pub mod auth_code;
pub mod booking;
pub mod comment;
pub mod content;
pub mod mentor;
pub mod post;
pub mod review;
pub mod session;
pub mod submission;
pub mod user;

pub use auth_code::{AuthCodeRepository, SqlxAuthCodeRepository};
pub use booking::{BookingRepository, BookingScope, SqlxBookingRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use content::{ContentRepository, SqlxContentRepository};
pub use mentor::{MentorRepository, SqlxMentorRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use review::{ReviewRepository, SqlxReviewRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use submission::{SqlxSubmissionRepository, SubmissionRepository};
pub use user::{SqlxUserRepository, UserRepository};
