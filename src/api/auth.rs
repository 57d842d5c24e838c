//! Authentication API endpoints
//!
//! - POST /api/v1/auth/register - Create an account and sign in
//! - POST /api/v1/auth/login - Email and password login
//! - POST /api/v1/auth/code - Email a one-time sign-in code
//! - POST /api/v1/auth/code/exchange - Trade a code for a recovery session
//! - POST /api/v1/auth/logout - End the current session
//! - GET /api/v1/auth/me - Current profile
//! - PUT /api/v1/auth/profile - Edit the current profile
//! - PUT /api/v1/auth/password - Change password

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::api::middleware::{
    clear_session_cookie, session_cookie, ApiError, AppState, AuthenticatedUser, CurrentSession,
};
use crate::models::{Session, UpdateProfileInput, User};
use crate::services::user::{LoginInput, RegisterInput, UserServiceError};

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CodeExchangeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: String,
}

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub expires_at: String,
    /// Recovery sessions may only be used to set a new password
    pub is_recovery: bool,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/code", post(request_code))
        .route("/code/exchange", post(exchange_code))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/profile", put(update_profile))
        .route("/password", put(change_password))
}

fn session_response(
    state: &AppState,
    status: StatusCode,
    user: User,
    session: Session,
) -> Result<impl IntoResponse, ApiError> {
    let headers = session_cookie(&session.id, state.user_service.session_max_age(&session))?;
    Ok((
        status,
        headers,
        Json(AuthResponse {
            user,
            expires_at: session.expires_at.to_rfc3339(),
            is_recovery: session.is_recovery,
            token: session.id,
        }),
    ))
}

/// Reject callers over the per-IP budget, then count this request
async fn check_ip_limit(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if let Some(ip) = extract_ip_address(headers) {
        if state.rate_limiter.is_ip_limited(ip).await {
            tracing::warn!("Auth rate limit hit for {}", ip);
            return Err(ApiError::rate_limited("Too many requests, try again later", 60));
        }
        state.rate_limiter.record_ip_request(ip).await;
    }
    Ok(())
}

/// POST /api/v1/auth/register
///
/// The first account becomes admin.
async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    check_ip_limit(&state, &headers).await?;

    let login = LoginInput::new(body.email.clone(), body.password.clone());
    state.user_service.register(body).await?;
    let (user, session) = state.user_service.login(login).await?;
    session_response(&state, StatusCode::CREATED, user, session)
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    check_ip_limit(&state, &headers).await?;

    // 5 failures per 15 minutes per account
    if state.rate_limiter.is_email_limited(&body.email).await {
        return Err(ApiError::rate_limited(
            "Too many failed attempts, try again in 15 minutes",
            900,
        ));
    }

    let email = body.email.clone();
    match state.user_service.login(body).await {
        Ok((user, session)) => {
            state.rate_limiter.clear_email_attempts(&email).await;
            tracing::info!("User {} logged in", user.id);
            session_response(&state, StatusCode::OK, user, session)
        }
        Err(e) => {
            if matches!(e, UserServiceError::AuthenticationError(_)) {
                state.rate_limiter.record_failed_attempt(&email).await;
            }
            Err(e.into())
        }
    }
}

/// POST /api/v1/auth/code
///
/// Always succeeds for well-formed addresses.
async fn request_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_ip_limit(&state, &headers).await?;
    if state.rate_limiter.is_code_request_limited(&body.email).await {
        return Err(ApiError::rate_limited("Too many code requests, try again later", 900));
    }
    state.rate_limiter.record_code_request(&body.email).await;

    state.user_service.request_code(&body.email).await?;
    Ok(Json(serde_json::json!({
        "message": "If the address is registered, a sign-in code has been sent"
    })))
}

/// POST /api/v1/auth/code/exchange
async fn exchange_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CodeExchangeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_ip_limit(&state, &headers).await?;

    // 5 wrong codes per 15 minutes per account, whatever the client address
    if state.rate_limiter.is_code_exchange_limited(&body.email).await {
        return Err(ApiError::rate_limited(
            "Too many wrong codes, try again in 15 minutes",
            900,
        ));
    }

    match state.user_service.exchange_code(&body.email, &body.code).await {
        Ok((user, session)) => {
            state.rate_limiter.clear_failed_codes(&body.email).await;
            tracing::info!("User {} signed in with a code", user.id);
            session_response(&state, StatusCode::OK, user, session)
        }
        Err(e) => {
            if matches!(e, UserServiceError::InvalidCode) {
                state.rate_limiter.record_failed_code(&body.email).await;
            }
            Err(e.into())
        }
    }
}

/// POST /api/v1/auth/logout
async fn logout(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<impl IntoResponse, ApiError> {
    state.user_service.logout(&session.id).await?;
    Ok((StatusCode::NO_CONTENT, clear_session_cookie()))
}

/// GET /api/v1/auth/me
async fn me(AuthenticatedUser(user): AuthenticatedUser) -> Json<User> {
    Json(user)
}

/// PUT /api/v1/auth/profile
async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(body): Json<UpdateProfileInput>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.user_service.update_profile(user.id, body).await?))
}

/// PUT /api/v1/auth/password
///
/// Recovery sessions may omit `current_password`. Other sessions of the
/// user are signed out.
async fn change_password(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    CurrentSession(session): CurrentSession,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .user_service
        .update_password(
            &user,
            &session,
            body.current_password.as_deref(),
            &body.new_password,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Client IP from proxy headers (X-Forwarded-For, then X-Real-IP)
fn extract_ip_address(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim);
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim);

    forwarded
        .and_then(|ip| ip.parse().ok())
        .or_else(|| real_ip.and_then(|ip| ip.parse().ok()))
}
