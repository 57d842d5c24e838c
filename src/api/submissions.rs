//! Mentor application endpoints
//!
//! - POST /api/v1/submissions - Apply to become a mentor
//! - GET /api/v1/admin/submissions - Review queue (`?status=pending`)
//! - GET /api/v1/admin/submissions/{id}
//! - POST /api/v1/admin/submissions/{id}/approve - Creates an unpublished mentor
//! - POST /api/v1/admin/submissions/{id}/reject

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_page_size, parse_filter};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, MaybeUser};
use crate::models::{MentorSubmission, PageParams, PagedResult, SubmissionInput, SubmissionStatus};
use crate::services::Approval;

#[derive(Debug, Deserialize)]
pub struct ListSubmissionsQuery {
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    pub note: Option<String>,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/submissions", post(create_submission))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/submissions", get(list_submissions))
        .route("/submissions/{id}", get(get_submission))
        .route("/submissions/{id}/approve", post(approve_submission))
        .route("/submissions/{id}/reject", post(reject_submission))
}

async fn create_submission(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Json(body): Json<SubmissionInput>,
) -> Result<(StatusCode, Json<MentorSubmission>), ApiError> {
    let submission = state.submission_service.create(user.as_ref(), body).await?;
    tracing::info!("Mentor application {} received", submission.id);
    Ok((StatusCode::CREATED, Json(submission)))
}

async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<ListSubmissionsQuery>,
) -> Result<Json<PagedResult<MentorSubmission>>, ApiError> {
    let status = parse_filter::<SubmissionStatus>(query.status.as_deref())?;
    let params = PageParams::new(query.page, query.page_size);
    Ok(Json(state.submission_service.list(status, params).await?))
}

async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MentorSubmission>, ApiError> {
    Ok(Json(state.submission_service.get_by_id(id).await?))
}

async fn approve_submission(
    State(state): State<AppState>,
    AuthenticatedUser(reviewer): AuthenticatedUser,
    Path(id): Path<i64>,
    body: Option<Json<ReviewRequest>>,
) -> Result<Json<Approval>, ApiError> {
    let note = body.and_then(|Json(b)| b.note);
    Ok(Json(state.submission_service.approve(id, &reviewer, note).await?))
}

async fn reject_submission(
    State(state): State<AppState>,
    AuthenticatedUser(reviewer): AuthenticatedUser,
    Path(id): Path<i64>,
    body: Option<Json<ReviewRequest>>,
) -> Result<Json<MentorSubmission>, ApiError> {
    let note = body.and_then(|Json(b)| b.note);
    Ok(Json(state.submission_service.reject(id, &reviewer, note).await?))
}
