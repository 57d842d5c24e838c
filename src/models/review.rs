//! Review model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rating left by a user for a mentor
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub mentor_id: i64,
    pub user_id: i64,
    /// 1..=5
    pub rating: i32,
    pub content: String,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
}

/// Review joined with its author's display fields
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReviewView {
    pub id: i64,
    pub mentor_id: i64,
    pub user_id: i64,
    pub rating: i32,
    pub content: String,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub author_name: String,
    pub author_avatar: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReviewInput {
    pub rating: i32,
    #[serde(default)]
    pub content: String,
}

/// Aggregate over visible reviews
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RatingSummary {
    pub count: i64,
    /// Rounded to one decimal; `None` without reviews
    pub average: Option<f64>,
}

impl RatingSummary {
    pub fn from_totals(total: i64, count: i64) -> Self {
        let average = if count > 0 {
            Some((total as f64 / count as f64 * 10.0).round() / 10.0)
        } else {
            None
        };
        Self {
            count: count.max(0),
            average,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_summary_rounds_to_one_decimal() {
        let summary = RatingSummary::from_totals(14, 3);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average, Some(4.7));
    }

    #[test]
    fn test_rating_summary_empty() {
        let summary = RatingSummary::from_totals(0, 0);
        assert_eq!(summary, RatingSummary::default());
    }
}
