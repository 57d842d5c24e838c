//! Data models
//!
//! Entities mirrored from the database tables, their input types, and the
//! paging containers shared by list endpoints.

mod booking;
mod comment;
mod content;
mod mentor;
mod paging;
mod post;
mod review;
mod session;
mod submission;
mod user;

pub use booking::{Booking, BookingStatus, BookingView, CreateBookingInput};
pub use comment::{Comment, CommentStatus, CommentView, CreateCommentInput};
pub use content::{ContentBlock, ContentInput, ContentKind};
pub use mentor::{
    Mentor, MentorFilter, MentorInput, MentorProfile, MentorSkill, MentorSort, MentorWithSkills,
    SortDirection,
};
pub use paging::{PageItem, PageParams, PagedResult};
pub use post::{Post, PostCategory, PostFilter, PostInput};
pub use review::{CreateReviewInput, RatingSummary, Review, ReviewView};
pub use session::{AuthCode, Session};
pub use submission::{MentorSubmission, SubmissionInput, SubmissionStatus};
pub use user::{UpdateProfileInput, User, UserFilter, UserRole, UserStatus};

/// Returned when a stored or submitted string names no known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Implements `Display`, `FromStr` (case-insensitive) and `TryFrom<String>`
/// for a fieldless enum stored as lowercase text.
macro_rules! string_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// All variants, in declaration order
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::models::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    _ => Err($crate::models::ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $ty {
            type Error = $crate::models::ParseEnumError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

pub(crate) use string_enum;
