//! Named remote procedures
//!
//! - GET /api/v1/rpc - Procedure catalogue
//! - POST /api/v1/rpc/{name} - Invoke with a JSON object of parameters

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;

use crate::api::middleware::{ApiError, AppState, MaybeUser};
use crate::services::rpc::{Procedure, PROCEDURES};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/rpc", get(list_procedures))
        .route("/rpc/{name}", post(call_procedure))
}

async fn list_procedures() -> Json<&'static [Procedure]> {
    Json(PROCEDURES)
}

/// POST /api/v1/rpc/{name}
///
/// An empty body is the same as `{}`.
async fn call_procedure(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(name): Path<String>,
    body: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    let params = body.map(|Json(v)| v).unwrap_or(Value::Null);
    let result = state.rpc_service.call(&name, user.as_ref(), params).await?;
    Ok(Json(result))
}
