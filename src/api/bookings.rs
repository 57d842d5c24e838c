//! Mentoring session booking endpoints
//!
//! - POST /api/v1/bookings - Request a session with a published mentor
//! - GET /api/v1/bookings - The caller's own requests
//! - PUT /api/v1/bookings/{id}/status - Confirm, complete or cancel
//! - GET /api/v1/mentor/bookings - Requests for the caller's mentor profile
//! - GET /api/v1/admin/bookings - Every booking

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{default_page, default_page_size, parse_filter};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{
    Booking, BookingStatus, BookingView, CreateBookingInput, PageParams, PagedResult,
};

#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    pub status: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl ListBookingsQuery {
    fn parts(&self) -> Result<(Option<BookingStatus>, PageParams), ApiError> {
        let status = parse_filter::<BookingStatus>(self.status.as_deref())?;
        Ok((status, PageParams::new(self.page, self.page_size)))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BookingStatus,
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_mine).post(create_booking))
        .route("/bookings/{id}/status", put(update_status))
        .route("/mentor/bookings", get(list_for_mentor))
}

pub fn admin_router() -> Router<AppState> {
    Router::new().route("/bookings", get(list_all))
}

async fn create_booking(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<CreateBookingInput>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let booking = state.booking_service.create(&user, body).await?;
    tracing::info!(
        "User {} requested booking {} with mentor {}",
        user.id,
        booking.id,
        booking.mentor_id
    );
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn list_mine(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<PagedResult<BookingView>>, ApiError> {
    let (status, params) = query.parts()?;
    Ok(Json(state.booking_service.list_mine(&user, status, params).await?))
}

async fn list_for_mentor(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<PagedResult<BookingView>>, ApiError> {
    let (status, params) = query.parts()?;
    Ok(Json(
        state.booking_service.list_for_mentor(&user, status, params).await?,
    ))
}

async fn list_all(
    State(state): State<AppState>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<PagedResult<BookingView>>, ApiError> {
    let (status, params) = query.parts()?;
    Ok(Json(state.booking_service.list_all(status, params).await?))
}

async fn update_status(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state.booking_service.update_status(&user, id, body.status).await?;
    tracing::info!("Booking {} is now {} (by user {})", id, booking.status, user.id);
    Ok(Json(booking))
}
