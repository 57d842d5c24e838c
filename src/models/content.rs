//! Home page content blocks
//!
//! Statistics, activities, partners and banners share one table. Which
//! columns are required depends on the kind; see
//! `services::content::validate_input`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::string_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Headline number, e.g. "120+ mentors"
    Statistic,
    /// Upcoming or past event teaser
    Activity,
    /// Partner logo
    Partner,
    /// Hero carousel slide
    Banner,
}

string_enum!(ContentKind, "content kind", {
    Statistic => "statistic",
    Activity => "activity",
    Partner => "partner",
    Banner => "banner",
});

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentBlock {
    pub id: i64,
    #[sqlx(try_from = "String")]
    pub kind: ContentKind,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub body: Option<String>,
    /// Statistic figure
    pub value: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub sort_order: i32,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentInput {
    pub kind: ContentKind,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub body: Option<String>,
    pub value: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    /// Appended after the last block of the same kind when absent
    pub sort_order: Option<i32>,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
}

fn default_visible() -> bool {
    true
}

impl ContentInput {
    pub fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            title: None,
            subtitle: None,
            body: None,
            value: None,
            image_url: None,
            link_url: None,
            sort_order: None,
            is_visible: true,
        }
    }
}
