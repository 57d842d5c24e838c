//! Common API utilities and shared types

use serde::{Deserialize, Deserializer};
use std::str::FromStr;

use crate::api::middleware::ApiError;
use crate::models::PageParams;

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size; larger requests are clamped to 100
pub fn default_page_size() -> u32 {
    12
}

/// Basic pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PaginationQuery {
    pub fn params(&self) -> PageParams {
        PageParams::new(self.page, self.page_size)
    }
}

/// Parse an optional enum filter (`?status=pending`), rejecting unknown values
pub fn parse_filter<T>(value: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ApiError::validation_error(e.to_string())),
        None => Ok(None),
    }
}

/// Treats `?q=` the same as an absent parameter
pub fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommentStatus;

    #[test]
    fn test_pagination_params_clamp() {
        let query = PaginationQuery {
            page: 0,
            page_size: 500,
        };
        let params = query.params();
        assert_eq!(params.page, 1);
        assert_eq!(params.page_size, 100);
        assert_eq!(PaginationQuery::default().params().page_size, 12);
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            parse_filter::<CommentStatus>(Some("approved")).unwrap(),
            Some(CommentStatus::Approved)
        );
        assert_eq!(parse_filter::<CommentStatus>(Some(" ")).unwrap(), None);
        assert_eq!(parse_filter::<CommentStatus>(None).unwrap(), None);
        let err = parse_filter::<CommentStatus>(Some("spam")).unwrap_err();
        assert_eq!(err.error.code, "VALIDATION_ERROR");
    }
}
