//! User administration
//!
//! - GET /api/v1/admin/users - Search accounts (`?q=&role=mentor`)
//! - PUT /api/v1/admin/users/{id}/role
//! - PUT /api/v1/admin/users/{id}/status - Ban or reactivate
//! - PUT /api/v1/admin/users/{id}/mentor - Link or unlink a mentor profile

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_page_size, empty_as_none, parse_filter};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{PageParams, PagedResult, User, UserRole, UserStatus};

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub q: Option<String>,
    pub role: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: UserStatus,
}

#[derive(Debug, Deserialize)]
pub struct LinkMentorRequest {
    pub mentor_id: Option<i64>,
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}/role", put(set_role))
        .route("/users/{id}/status", put(set_status))
        .route("/users/{id}/mentor", put(link_mentor))
}

async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<PagedResult<User>>, ApiError> {
    let role = parse_filter::<UserRole>(query.role.as_deref())?;
    let params = PageParams::new(query.page, query.page_size);
    Ok(Json(state.user_service.list_users(query.q, role, params).await?))
}

async fn set_role(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<RoleRequest>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.user_service.set_role(&actor, id, body.role).await?))
}

async fn set_status(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state.user_service.set_status(&actor, id, body.status).await?;
    tracing::info!("User {} set status of {} to {}", actor.id, id, body.status);
    Ok(Json(user))
}

async fn link_mentor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<LinkMentorRequest>,
) -> Result<Json<User>, ApiError> {
    if let Some(mentor_id) = body.mentor_id {
        // 404 for unknown mentors rather than a foreign key failure
        state.mentor_service.get_by_id(mentor_id).await?;
    }
    Ok(Json(state.user_service.link_mentor(id, body.mentor_id).await?))
}
