//! Services layer - Business logic
//!
//! This module contains the business logic services for HR Companion.
//! Services are responsible for:
//! - Implementing business rules
//! - Coordinating between repositories and cache
//! - Handling validation and error cases

pub mod booking;
pub mod comment;
pub mod content;
pub mod dashboard;
pub mod email;
pub mod error;
pub mod home;
pub mod markdown;
pub mod mentor;
pub mod pagination;
pub mod password;
pub mod post;
pub mod rate_limiter;
pub mod review;
pub mod rpc;
pub mod slug;
pub mod storage;
pub mod submission;
pub mod user;

pub use booking::BookingService;
pub use comment::CommentService;
pub use content::ContentService;
pub use dashboard::{Dashboard, DashboardService};
pub use email::{generate_code, EmailError, EmailService};
pub use error::ServiceError;
pub use home::{HomeContent, HomeService};
pub use markdown::MarkdownRenderer;
pub use mentor::{normalize_skills, sort_mentors, MentorService};
pub use pagination::{page_window, total_pages};
pub use password::{hash_password, verify_password};
pub use post::PostService;
pub use rate_limiter::LoginRateLimiter;
pub use review::ReviewService;
pub use rpc::{RpcError, RpcService};
pub use slug::generate_slug;
pub use storage::{StorageError, StorageService, StoredObject};
pub use submission::{Approval, SubmissionService};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
