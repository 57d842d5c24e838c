//! Post model
//!
//! Posts are blog entries or activity reports. Markdown `content` is rendered
//! to `content_html` on every write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::string_enum;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub content_html: String,
    pub cover_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub category: PostCategory,
    pub author_id: Option<i64>,
    pub is_published: bool,
    /// Set on first publish and kept across unpublish/republish
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    /// Approved comments only
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostCategory {
    #[default]
    Blog,
    Activity,
}

string_enum!(PostCategory, "post category", {
    Blog => "blog",
    Activity => "activity",
});

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostInput {
    #[serde(default)]
    pub title: String,
    /// Generated from the title when empty
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: String,
    pub cover_url: Option<String>,
    #[serde(default)]
    pub category: PostCategory,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Clone)]
pub struct PostFilter {
    pub q: Option<String>,
    pub category: Option<PostCategory>,
    pub published_only: bool,
    pub limit: i64,
    pub offset: i64,
}

impl Default for PostFilter {
    fn default() -> Self {
        Self {
            q: None,
            category: None,
            published_only: true,
            limit: 10,
            offset: 0,
        }
    }
}
