//! Comment API endpoints
//!
//! - GET /api/v1/posts/{post}/comments - Approved comments
//! - POST /api/v1/posts/{post}/comments - Comment as the signed-in user or a guest
//! - GET /api/v1/admin/comments - Moderation queue (`?status=pending`)
//! - PUT /api/v1/admin/comments/{id}/status
//! - DELETE /api/v1/admin/comments/{id}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{default_page, default_page_size, parse_filter};
use crate::api::middleware::{ApiError, AppState, MaybeUser};
use crate::models::{CommentStatus, CommentView, CreateCommentInput, PageParams, PagedResult};

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Deserialize)]
pub struct ModerationQuery {
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: CommentStatus,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route(
        "/posts/{post}/comments",
        get(list_comments).post(create_comment),
    )
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/comments", get(moderation_queue))
        .route("/comments/{id}/status", put(update_status))
        .route("/comments/{id}", axum::routing::delete(delete_comment))
}

async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<CommentListResponse>, ApiError> {
    let comments = state.comment_service.list_for_post(post_id).await?;
    Ok(Json(CommentListResponse { comments }))
}

async fn create_comment(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(post_id): Path<i64>,
    Json(body): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    let input = CreateCommentInput {
        post_id,
        user_id: user.as_ref().map(|u| u.id),
        author_name: body.author_name,
        author_email: body.author_email,
        content: body.content,
    };
    let comment = state.comment_service.create(user.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn moderation_queue(
    State(state): State<AppState>,
    Query(query): Query<ModerationQuery>,
) -> Result<Json<PagedResult<CommentView>>, ApiError> {
    let status = parse_filter::<CommentStatus>(query.status.as_deref())?;
    let params = PageParams::new(query.page, query.page_size);
    Ok(Json(state.comment_service.list(status, params).await?))
}

async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<CommentView>, ApiError> {
    Ok(Json(state.comment_service.update_status(id, body.status).await?))
}

async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comment_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
