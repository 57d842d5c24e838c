//! GET /api/v1/home - Statistics, activities, partners, banners, featured
//! mentors and latest posts in one payload

use axum::{extract::State, routing::get, Json, Router};

use crate::api::middleware::{ApiError, AppState};
use crate::services::HomeContent;

pub fn public_router() -> Router<AppState> {
    Router::new().route("/home", get(get_home))
}

async fn get_home(State(state): State<AppState>) -> Result<Json<HomeContent>, ApiError> {
    Ok(Json(state.home_service.load().await?))
}
