//! Blog and activity post endpoints
//!
//! - GET /api/v1/posts - Published posts (`?category=activity&q=...`)
//! - GET /api/v1/posts/{post} - Post by slug; counts a view
//! - GET /api/v1/admin/posts - All posts, drafts included
//! - POST /api/v1/admin/posts
//! - GET/PUT/DELETE /api/v1/admin/posts/{id}
//! - PUT /api/v1/admin/posts/{id}/publish - Toggle published

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_page_size, empty_as_none, parse_filter};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{PageParams, PagedResult, Post, PostCategory, PostFilter, PostInput};

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub q: Option<String>,
    pub category: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl ListPostsQuery {
    pub(crate) fn filter(&self, published_only: bool) -> Result<PostFilter, ApiError> {
        Ok(PostFilter {
            q: self.q.clone(),
            category: parse_filter::<PostCategory>(self.category.as_deref())?,
            published_only,
            ..PostFilter::default()
        })
    }
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route("/posts/{post}", get(get_post))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(admin_list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(admin_get_post).put(update_post).delete(delete_post),
        )
        .route("/posts/{id}/publish", put(toggle_published))
}

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PagedResult<Post>>, ApiError> {
    let filter = query.filter(true)?;
    let params = PageParams::new(query.page, query.page_size);
    Ok(Json(state.post_service.list(filter, params).await?))
}

async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.post_service.view(&slug).await?))
}

async fn admin_list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PagedResult<Post>>, ApiError> {
    let filter = query.filter(false)?;
    let params = PageParams::new(query.page, query.page_size);
    Ok(Json(state.post_service.list(filter, params).await?))
}

async fn admin_get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.post_service.get_by_id(id).await?))
}

async fn create_post(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<PostInput>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let post = state.post_service.create(Some(user.id), body).await?;
    tracing::info!("User {} created post {}", user.id, post.slug);
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<PostInput>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.post_service.update(id, body).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.post_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_published(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.post_service.toggle_published(id).await?))
}
