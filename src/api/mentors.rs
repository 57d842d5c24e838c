//! Mentor directory API endpoints
//!
//! `{mentor}` is the slug on the profile route and the numeric id elsewhere.
//!
//! Public:
//! - GET /api/v1/mentors - Search, filter and sort published mentors
//! - GET /api/v1/mentors/skills - Skill facet with mentor counts
//! - GET /api/v1/mentors/{slug} - Profile with rendered bio and reviews
//! - GET /api/v1/mentors/{id}/reviews - Visible reviews, paged
//!
//! Authenticated:
//! - POST /api/v1/mentors/{id}/reviews - Review a mentor
//!
//! Admin:
//! - GET/POST /api/v1/admin/mentors
//! - GET/PUT/DELETE /api/v1/admin/mentors/{id}
//! - PUT /api/v1/admin/mentors/{id}/publish - Toggle published
//! - PUT /api/v1/admin/mentors/{id}/skills - Replace skills
//! - PUT /api/v1/admin/reviews/{id}/visibility
//! - DELETE /api/v1/admin/reviews/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{default_page, default_page_size, empty_as_none, parse_filter};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{
    CreateReviewInput, Mentor, MentorFilter, MentorInput, MentorProfile, MentorSort,
    MentorWithSkills, PageParams, PagedResult, Review, ReviewView, SortDirection,
};

/// Directory query, e.g. `?q=recruiting&skill=Interviewing&sort=rating&order=desc`
#[derive(Debug, Deserialize)]
pub struct ListMentorsQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub q: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub skill: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl ListMentorsQuery {
    /// Filter for the public directory. Unknown sort keys are rejected.
    pub fn filter(&self, published_only: bool) -> Result<MentorFilter, ApiError> {
        Ok(MentorFilter {
            q: self.q.clone(),
            skill: self.skill.clone(),
            published_only,
            featured_only: self.featured,
            sort: parse_filter::<MentorSort>(self.sort.as_deref())?.unwrap_or_default(),
            direction: parse_filter::<SortDirection>(self.order.as_deref())?,
            ..MentorFilter::default()
        })
    }

    pub fn params(&self) -> PageParams {
        PageParams::new(self.page, self.page_size)
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Serialize)]
pub struct SkillCount {
    pub name: String,
    pub mentors: i64,
}

#[derive(Debug, Deserialize)]
pub struct SkillsRequest {
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SkillsResponse {
    pub skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub is_visible: bool,
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/mentors", get(list_mentors))
        .route("/mentors/skills", get(list_skills))
        .route("/mentors/{mentor}", get(get_profile))
        .route("/mentors/{mentor}/reviews", get(list_reviews))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/mentors/{mentor}/reviews", post(create_review))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/mentors", get(admin_list_mentors).post(create_mentor))
        .route(
            "/mentors/{id}",
            get(admin_get_mentor).put(update_mentor).delete(delete_mentor),
        )
        .route("/mentors/{id}/publish", put(toggle_published))
        .route("/mentors/{id}/skills", put(set_skills))
        .route("/reviews/{id}/visibility", put(set_review_visibility))
        .route("/reviews/{id}", axum::routing::delete(delete_review))
}

/// GET /api/v1/mentors
async fn list_mentors(
    State(state): State<AppState>,
    Query(query): Query<ListMentorsQuery>,
) -> Result<Json<PagedResult<MentorWithSkills>>, ApiError> {
    let filter = query.filter(true)?;
    let result = state.mentor_service.list(filter, query.params()).await?;
    Ok(Json(result))
}

/// GET /api/v1/mentors/skills
async fn list_skills(State(state): State<AppState>) -> Result<Json<Vec<SkillCount>>, ApiError> {
    let counts = state.mentor_service.skill_counts().await?;
    Ok(Json(
        counts
            .into_iter()
            .map(|(name, mentors)| SkillCount { name, mentors })
            .collect(),
    ))
}

/// GET /api/v1/mentors/{slug}
async fn get_profile(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<MentorProfile>, ApiError> {
    Ok(Json(state.mentor_service.profile(&slug).await?))
}

/// GET /api/v1/mentors/{id}/reviews
async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<ReviewsQuery>,
) -> Result<Json<PagedResult<ReviewView>>, ApiError> {
    let params = PageParams::new(query.page, query.page_size);
    Ok(Json(state.review_service.list_for_mentor(id, params).await?))
}

/// POST /api/v1/mentors/{id}/reviews
async fn create_review(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<CreateReviewInput>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    let review = state.review_service.create(&user, id, body).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /api/v1/admin/mentors
///
/// Same query as the public directory, drafts included.
async fn admin_list_mentors(
    State(state): State<AppState>,
    Query(query): Query<ListMentorsQuery>,
) -> Result<Json<PagedResult<MentorWithSkills>>, ApiError> {
    let filter = query.filter(false)?;
    Ok(Json(state.mentor_service.list(filter, query.params()).await?))
}

async fn admin_get_mentor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MentorWithSkills>, ApiError> {
    Ok(Json(state.mentor_service.get_by_id(id).await?))
}

async fn create_mentor(
    State(state): State<AppState>,
    Json(body): Json<MentorInput>,
) -> Result<(StatusCode, Json<MentorWithSkills>), ApiError> {
    let mentor = state.mentor_service.create(body).await?;
    tracing::info!("Created mentor {} ({})", mentor.mentor.id, mentor.mentor.slug);
    Ok((StatusCode::CREATED, Json(mentor)))
}

async fn update_mentor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<MentorInput>,
) -> Result<Json<MentorWithSkills>, ApiError> {
    Ok(Json(state.mentor_service.update(id, body).await?))
}

async fn delete_mentor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.mentor_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/admin/mentors/{id}/publish
async fn toggle_published(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Mentor>, ApiError> {
    Ok(Json(state.mentor_service.toggle_published(id).await?))
}

/// PUT /api/v1/admin/mentors/{id}/skills
async fn set_skills(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<SkillsRequest>,
) -> Result<Json<SkillsResponse>, ApiError> {
    let skills = state.mentor_service.set_skills(id, body.skills).await?;
    Ok(Json(SkillsResponse { skills }))
}

/// PUT /api/v1/admin/reviews/{id}/visibility
async fn set_review_visibility(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<VisibilityRequest>,
) -> Result<Json<Review>, ApiError> {
    Ok(Json(state.review_service.set_visible(id, body.is_visible).await?))
}

async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.review_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(sort: Option<&str>, order: Option<&str>) -> ListMentorsQuery {
        ListMentorsQuery {
            q: Some("hiring".to_string()),
            skill: None,
            sort: sort.map(String::from),
            order: order.map(String::from),
            featured: false,
            page: 2,
            page_size: 6,
        }
    }

    #[test]
    fn test_filter_from_query() {
        let filter = query(Some("rating"), None).filter(true).unwrap();
        assert_eq!(filter.sort, MentorSort::Rating);
        assert_eq!(filter.direction, None);
        assert_eq!(filter.effective_direction(), SortDirection::Desc);
        assert!(filter.published_only);

        let filter = query(Some("name"), Some("desc")).filter(false).unwrap();
        assert_eq!(filter.effective_direction(), SortDirection::Desc);
        assert!(!filter.published_only);
    }

    #[test]
    fn test_filter_rejects_unknown_sort() {
        let err = query(Some("salary"), None).filter(true).unwrap_err();
        assert_eq!(err.error.code, "VALIDATION_ERROR");
        assert!(query(None, Some("sideways")).filter(true).is_err());
    }

    #[test]
    fn test_params_clamp() {
        let mut q = query(None, None);
        q.page_size = 1000;
        assert_eq!(q.params().page_size, 100);
        assert_eq!(q.params().page, 2);
    }
}
