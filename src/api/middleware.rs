//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error envelope and its mapping from service errors
//! - Authentication (session token validation) and admin authorization
//! - Request statistics

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::models::{Session, User};
use crate::services::{
    BookingService, CommentService, ContentService, DashboardService, HomeService,
    LoginRateLimiter, MentorService, PostService, ReviewService, RpcError, RpcService,
    ServiceError, StorageError, StorageService, SubmissionService, UserService, UserServiceError,
};
use crate::web::PageRenderer;

// ============================================================================
// Request Statistics
// ============================================================================

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    total_requests: AtomicU64,
    /// Sum of response times in microseconds
    total_response_time_us: AtomicU64,
    start_time: Instant,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, duration_us: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_us.fetch_add(duration_us, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.total_response_time_us.load(Ordering::Relaxed) as f64 / total as f64
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub mentor_service: Arc<MentorService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub content_service: Arc<ContentService>,
    pub submission_service: Arc<SubmissionService>,
    pub booking_service: Arc<BookingService>,
    pub review_service: Arc<ReviewService>,
    pub storage_service: Arc<StorageService>,
    pub home_service: Arc<HomeService>,
    pub dashboard_service: Arc<DashboardService>,
    pub rpc_service: Arc<RpcService>,
    pub rate_limiter: Arc<LoginRateLimiter>,
    pub pages: Arc<PageRenderer>,
    pub request_stats: Arc<RequestStats>,
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Session that authenticated the request
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

/// User when the request carried a valid session, for routes behind
/// [`optional_auth`]
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts.extensions.get::<AuthenticatedUser>().map(|u| u.0.clone()),
        ))
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after_secs: u64) -> Self {
        Self::with_details(
            "RATE_LIMITED",
            message,
            serde_json::json!({ "retry_after": retry_after_secs }),
        )
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" | "USER_BANNED" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "RATE_LIMITED" => StatusCode::TOO_MANY_REQUESTS,
            "PAYLOAD_TOO_LARGE" => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Internal errors are logged in full and reported generically
fn internal(e: &anyhow::Error) -> ApiError {
    tracing::error!("Internal error: {:#}", e);
    ApiError::internal_error("Internal server error")
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            ServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ServiceError::Conflict(msg) => ApiError::conflict(msg),
            ServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ServiceError::InternalError(ref inner) => internal(inner),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::UserBanned => ApiError::new("USER_BANNED", e.to_string()),
            UserServiceError::InvalidCode => ApiError::unauthorized(e.to_string()),
            UserServiceError::NotFound(_) => ApiError::not_found(e.to_string()),
            UserServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            UserServiceError::InternalError(ref inner) => internal(inner),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::UnknownBucket(_) | StorageError::NotFound(_) => {
                ApiError::not_found(e.to_string())
            }
            StorageError::Forbidden(_) => ApiError::forbidden(e.to_string()),
            StorageError::TooLarge { max } => ApiError::with_details(
                "PAYLOAD_TOO_LARGE",
                e.to_string(),
                serde_json::json!({ "max_bytes": max }),
            ),
            StorageError::InvalidType(_) | StorageError::Empty | StorageError::InvalidName(_) => {
                ApiError::validation_error(e.to_string())
            }
            StorageError::Io(ref io) => {
                tracing::error!("Storage I/O error: {}", io);
                ApiError::internal_error("Failed to access storage")
            }
        }
    }
}

impl From<RpcError> for ApiError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::UnknownProcedure(_) => ApiError::not_found(e.to_string()),
            RpcError::InvalidParams(msg) => ApiError::validation_error(msg),
            RpcError::Unauthorized => ApiError::unauthorized(e.to_string()),
            RpcError::Forbidden => ApiError::forbidden(e.to_string()),
            RpcError::Service(inner) => inner.into(),
            RpcError::User(inner) => inner.into(),
        }
    }
}

// ============================================================================
// Sessions
// ============================================================================

/// Extract session token: `Authorization: Bearer` first, then the cookie
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
    {
        return Some(token.trim().to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .map(str::trim)
                .find_map(|c| c.strip_prefix("session="))
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
}

/// `Set-Cookie` header carrying the session token
pub(crate) fn session_cookie(token: &str, max_age_secs: i64) -> Result<HeaderMap, ApiError> {
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token,
        max_age_secs.max(0)
    );
    let value = HeaderValue::from_str(&cookie)
        .map_err(|_| ApiError::internal_error("Invalid session token"))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}

pub(crate) fn clear_session_cookie() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    );
    headers
}

async fn resolve_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<(Session, User)>, ApiError> {
    match extract_session_token(headers) {
        Some(token) => Ok(state.user_service.validate_session(&token).await?),
        None => Ok(None),
    }
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if extract_session_token(request.headers()).is_none() {
        return Err(ApiError::unauthorized("Missing authentication token"));
    }
    let (session, user) = resolve_session(&state, request.headers())
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;
    if user.is_banned() {
        return Err(UserServiceError::UserBanned.into());
    }
    if session.is_recovery && !recovery_allows(request.uri().path()) {
        return Err(ApiError::forbidden(
            "Set a new password before using this session",
        ));
    }

    request.extensions_mut().insert(CurrentSession(session));
    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Endpoints a recovery session may reach
const RECOVERY_PATHS: [&str; 3] = ["/auth/password", "/auth/me", "/auth/logout"];

/// Nesting may strip the `/api/v1` prefix, so match on the tail
fn recovery_allows(path: &str) -> bool {
    let path = path.trim_end_matches('/');
    RECOVERY_PATHS.iter().any(|allowed| path.ends_with(allowed))
}

/// Optional authentication middleware; invalid tokens are treated as absent
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_session(&state, request.headers()).await {
        Ok(Some((session, user))) if !user.is_banned() && !session.is_recovery => {
            request.extensions_mut().insert(CurrentSession(session));
            request.extensions_mut().insert(AuthenticatedUser(user));
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Ignoring session lookup failure: {}", e.error.message),
    }
    next.run(request).await
}

/// Admin authorization middleware; runs after [`require_auth`]
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_admin() {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}

/// Request statistics middleware
///
/// Records request count and response time for the admin stats page.
pub async fn request_stats_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    state.request_stats.record(start.elapsed().as_micros() as u64);
    response
}

// ============================================================================
// Tests
// ============================================================================
