//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::string_enum;

/// Moderation state. Only approved comments are public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    #[default]
    Pending,
    Approved,
    Hidden,
}

string_enum!(CommentStatus, "comment status", {
    Pending => "pending",
    Approved => "approved",
    Hidden => "hidden",
});

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: Option<i64>,
    pub author_name: String,
    #[serde(skip_serializing, default)]
    pub author_email: Option<String>,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub status: CommentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment with a display avatar
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub avatar_url: String,
}

impl CommentView {
    pub fn new(comment: Comment) -> Self {
        let avatar_url = Self::gravatar_url(comment.author_email.as_deref());
        Self {
            comment,
            avatar_url,
        }
    }

    /// Generate Gravatar URL from email
    pub fn gravatar_url(email: Option<&str>) -> String {
        match email {
            Some(e) if !e.trim().is_empty() => {
                let hash = format!("{:x}", md5::compute(e.trim().to_lowercase()));
                format!("https://www.gravatar.com/avatar/{}?d=mp&s=80", hash)
            }
            _ => "https://www.gravatar.com/avatar/?d=mp&s=80".to_string(),
        }
    }
}

/// Input for creating a comment. For signed-in authors the name and email
/// come from the profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCommentInput {
    #[serde(default)]
    pub post_id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    #[serde(default)]
    pub content: String,
}
