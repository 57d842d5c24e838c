//! Home page content blocks (statistics, activities, partners, banners)
//!
//! - GET /api/v1/content/{kind} - Visible blocks in display order
//! - GET/POST /api/v1/admin/content
//! - PUT/DELETE /api/v1/admin/content/{id}
//! - PUT /api/v1/admin/content/{id}/visibility - Toggle visibility
//! - PUT /api/v1/admin/content/reorder - Reorder one kind

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{ContentBlock, ContentInput, ContentKind};

#[derive(Debug, Deserialize)]
pub struct AdminContentQuery {
    pub kind: ContentKind,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub kind: ContentKind,
    #[serde(default)]
    pub ids: Vec<i64>,
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/content/{kind}", get(list_visible))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/content", get(admin_list).post(create_block))
        .route("/content/reorder", put(reorder))
        .route("/content/{id}", put(update_block).delete(delete_block))
        .route("/content/{id}/visibility", put(toggle_visible))
}

async fn list_visible(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<ContentBlock>>, ApiError> {
    let kind: ContentKind = kind
        .parse()
        .map_err(|e: crate::models::ParseEnumError| ApiError::not_found(e.to_string()))?;
    Ok(Json(state.content_service.list(kind, true).await?))
}

async fn admin_list(
    State(state): State<AppState>,
    Query(query): Query<AdminContentQuery>,
) -> Result<Json<Vec<ContentBlock>>, ApiError> {
    Ok(Json(state.content_service.list(query.kind, false).await?))
}

async fn create_block(
    State(state): State<AppState>,
    Json(body): Json<ContentInput>,
) -> Result<(StatusCode, Json<ContentBlock>), ApiError> {
    let block = state.content_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(block)))
}

async fn update_block(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ContentInput>,
) -> Result<Json<ContentBlock>, ApiError> {
    Ok(Json(state.content_service.update(id, body).await?))
}

async fn delete_block(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.content_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_visible(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ContentBlock>, ApiError> {
    Ok(Json(state.content_service.toggle_visible(id).await?))
}

async fn reorder(
    State(state): State<AppState>,
    Json(body): Json<ReorderRequest>,
) -> Result<Json<Vec<ContentBlock>>, ApiError> {
    Ok(Json(state.content_service.reorder(body.kind, &body.ids).await?))
}
