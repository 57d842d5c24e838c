//! Mentor registration submissions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use super::string_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

string_enum!(SubmissionStatus, "submission status", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

/// Application to become a mentor, reviewed by an admin
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MentorSubmission {
    pub id: i64,
    /// Submitting profile, when signed in
    pub user_id: Option<i64>,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub title: String,
    pub company: Option<String>,
    pub bio: String,
    /// Comma separated in storage, a list on the wire
    #[serde(serialize_with = "serialize_skills")]
    pub skills: String,
    pub linkedin_url: Option<String>,
    pub avatar_url: Option<String>,
    pub years_experience: i32,
    #[sqlx(try_from = "String")]
    pub status: SubmissionStatus,
    pub review_note: Option<String>,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Mentor created on approval
    pub mentor_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MentorSubmission {
    pub fn skill_list(&self) -> Vec<String> {
        split_skills(&self.skills)
    }
}

pub(crate) fn split_skills(skills: &str) -> Vec<String> {
    skills
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn serialize_skills<S: Serializer>(skills: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(split_skills(skills))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionInput {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub title: String,
    pub company: Option<String>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub linkedin_url: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub years_experience: i32,
}
