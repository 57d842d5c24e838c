//! File upload endpoints
//!
//! - POST /api/v1/storage/{bucket} - Upload one file (multipart field `file`);
//!   non-admins are limited to the configured user buckets
//! - DELETE /api/v1/admin/storage/{bucket}/{file}
//!
//! Stored files are served from `/storage/{bucket}/{file}` by the outer router.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::services::{StorageError, StoredObject};

/// Multipart overhead allowed on top of the configured file size
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn protected_router(max_file_size: u64) -> Router<AppState> {
    Router::new()
        .route("/storage/{bucket}", post(upload_file))
        .layer(DefaultBodyLimit::max(max_file_size as usize + MULTIPART_OVERHEAD))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/storage/{bucket}/{file}", delete(remove_file))
}

/// POST /api/v1/storage/{bucket}
async fn upload_file(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(bucket): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoredObject>), ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            too_large(state.storage_service.max_file_size())
        } else {
            ApiError::validation_error(format!("Failed to read multipart: {}", e))
        }
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let data = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                too_large(state.storage_service.max_file_size())
            } else {
                ApiError::validation_error(format!("Failed to read file: {}", e))
            }
        })?;

        let stored = state
            .storage_service
            .upload(&bucket, &content_type, &data, user.is_admin())
            .await?;
        tracing::debug!("User {} uploaded {}/{}", user.id, stored.bucket, stored.path);
        return Ok((StatusCode::CREATED, Json(stored)));
    }

    Err(ApiError::validation_error("No file provided"))
}

/// The body limit tripped while streaming the upload
fn too_large(max: u64) -> ApiError {
    StorageError::TooLarge { max }.into()
}

/// DELETE /api/v1/admin/storage/{bucket}/{file}
async fn remove_file(
    State(state): State<AppState>,
    Path((bucket, file)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.storage_service.remove(&bucket, &file).await?;
    Ok(StatusCode::NO_CONTENT)
}
