//! API layer - HTTP handlers and routing
//!
//! JSON endpoints live under `/api/v1`. Page routes from [`crate::web`] and
//! stored files under `/storage` share the same router.

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod comments;
pub mod common;
pub mod content;
pub mod home;
pub mod mentors;
pub mod middleware;
pub mod posts;
pub mod rpc;
pub mod storage;
pub mod submissions;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

pub use middleware::{ApiError, AppState, RequestStats};

/// Build the `/api/v1` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest(
            "/admin",
            admin::admin_router()
                .merge(content::admin_router())
                .merge(mentors::admin_router())
                .merge(submissions::admin_router())
                .merge(users::admin_router())
                .merge(posts::admin_router())
                .merge(comments::admin_router())
                .merge(bookings::admin_router())
                .merge(storage::admin_router()),
        )
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .merge(bookings::protected_router())
        .merge(mentors::protected_router())
        .merge(storage::protected_router(state.storage_service.max_file_size()))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes; a valid session is picked up when present
    let public_routes = Router::new()
        .merge(home::public_router())
        .merge(mentors::public_router())
        .merge(posts::public_router())
        .merge(comments::public_router())
        .merge(content::public_router())
        .merge(submissions::public_router())
        .merge(rpc::public_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ));

    Router::new()
        .nest("/auth", auth::public_router())
        .merge(public_routes)
        .merge(admin_routes)
        .merge(protected_routes)
        .fallback(api_not_found)
}

/// Build the complete application router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!("Ignoring invalid CORS origin {:?}", cors_origin);
            cors
        }
    };

    let web_routes = crate::web::router().route_layer(axum_middleware::from_fn_with_state(
        state.clone(),
        middleware::optional_auth,
    ));

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .nest_service("/storage", ServeDir::new(state.storage_service.root()))
        .merge(web_routes)
        .fallback(crate::web::not_found)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        // Request stats middleware (outermost layer, runs for all requests)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::request_stats_middleware,
        ))
        .with_state(state)
}

async fn api_not_found() -> ApiError {
    ApiError::not_found("No such endpoint")
}

#[cfg(test)]
mod tests;
