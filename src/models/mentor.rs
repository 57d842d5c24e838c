//! Mentor model
//!
//! Mentors are the expert profiles shown in the directory. Skills are a
//! one-to-many relation stored in `mentor_skills`; the rating aggregate is
//! denormalized onto the mentor row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{string_enum, RatingSummary, ReviewView};

/// Mentor entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Mentor {
    pub id: i64,
    /// URL-friendly identifier (unique)
    pub slug: String,
    pub full_name: String,
    /// Job title shown under the name
    pub title: String,
    pub company: Option<String>,
    /// Markdown biography
    pub bio: String,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
    pub linkedin_url: Option<String>,
    pub location: Option<String>,
    pub years_experience: i32,
    pub is_published: bool,
    pub is_featured: bool,
    pub sort_order: i32,
    /// Sum of visible review ratings
    pub rating_total: i64,
    /// Number of visible reviews
    pub rating_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Mentor {
    pub fn rating(&self) -> RatingSummary {
        RatingSummary::from_totals(self.rating_total, self.rating_count)
    }
}

/// Skill row attached to a mentor
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MentorSkill {
    pub id: i64,
    pub mentor_id: i64,
    pub name: String,
    pub sort_order: i32,
}

/// Mentor with skill names, as shown in directory cards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentorWithSkills {
    #[serde(flatten)]
    pub mentor: Mentor,
    pub skills: Vec<String>,
    pub rating: RatingSummary,
}

impl MentorWithSkills {
    pub fn new(mentor: Mentor, skills: Vec<String>) -> Self {
        let rating = mentor.rating();
        Self {
            mentor,
            skills,
            rating,
        }
    }
}

/// Public profile page payload
#[derive(Debug, Clone, Serialize)]
pub struct MentorProfile {
    #[serde(flatten)]
    pub mentor: MentorWithSkills,
    pub bio_html: String,
    pub reviews: Vec<ReviewView>,
}

/// Create/update input. Updates replace every field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MentorInput {
    /// Generated from `full_name` when empty
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub title: String,
    pub company: Option<String>,
    #[serde(default)]
    pub bio: String,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
    pub linkedin_url: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub years_experience: i32,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub sort_order: i32,
    /// When present, replaces the mentor's skills
    pub skills: Option<Vec<String>>,
}

/// Directory ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MentorSort {
    /// Admin-defined order, then name
    #[default]
    SortOrder,
    Name,
    Newest,
    Experience,
    Rating,
}

string_enum!(MentorSort, "mentor sort", {
    SortOrder => "sort_order",
    Name => "name",
    Newest => "newest",
    Experience => "experience",
    Rating => "rating",
});

impl MentorSort {
    /// Direction used when the request names none
    pub fn default_direction(&self) -> SortDirection {
        match self {
            MentorSort::SortOrder | MentorSort::Name => SortDirection::Asc,
            MentorSort::Newest | MentorSort::Experience | MentorSort::Rating => SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

string_enum!(SortDirection, "sort direction", {
    Asc => "asc",
    Desc => "desc",
});

impl SortDirection {
    pub fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Directory query
#[derive(Debug, Clone)]
pub struct MentorFilter {
    /// Matches name, title or company
    pub q: Option<String>,
    /// Exact skill name (case-insensitive)
    pub skill: Option<String>,
    pub published_only: bool,
    pub featured_only: bool,
    pub sort: MentorSort,
    /// Falls back to `sort.default_direction()`
    pub direction: Option<SortDirection>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for MentorFilter {
    fn default() -> Self {
        Self {
            q: None,
            skill: None,
            published_only: true,
            featured_only: false,
            sort: MentorSort::default(),
            direction: None,
            limit: 12,
            offset: 0,
        }
    }
}

impl MentorFilter {
    pub fn effective_direction(&self) -> SortDirection {
        self.direction.unwrap_or_else(|| self.sort.default_direction())
    }
}
