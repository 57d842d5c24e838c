//! Application wiring: repositories, services and background maintenance

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::api::middleware::{AppState, RequestStats};
use crate::cache::create_cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxAuthCodeRepository, SqlxBookingRepository, SqlxCommentRepository, SqlxContentRepository,
    SqlxMentorRepository, SqlxPostRepository, SqlxReviewRepository, SqlxSessionRepository,
    SqlxSubmissionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{
    BookingService, CommentService, ContentService, DashboardService, EmailService, HomeService,
    LoginRateLimiter, MentorService, PostService, ReviewService, RpcService, StorageService,
    SubmissionService, UserService,
};
use crate::web::PageRenderer;

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(3600);

/// Build the shared state for a migrated database
pub fn build_state(config: &Config, pool: DynDatabasePool) -> Result<AppState> {
    let cache = create_cache(&config.cache);

    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let mentor_repo = SqlxMentorRepository::boxed(pool.clone());
    let review_repo = SqlxReviewRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());
    let content_repo = SqlxContentRepository::boxed(pool.clone());
    let booking_repo = SqlxBookingRepository::boxed(pool.clone());

    let email = Arc::new(EmailService::new(config.mail.clone()));
    if !email.is_enabled() {
        tracing::warn!("Mail is disabled; sign-in codes and booking notices will not be sent");
    }

    let user_service = Arc::new(UserService::new(
        user_repo.clone(),
        SqlxSessionRepository::boxed(pool.clone()),
        SqlxAuthCodeRepository::boxed(pool.clone()),
        email.clone(),
        config.auth.clone(),
    ));
    let mentor_service = Arc::new(MentorService::new(
        mentor_repo.clone(),
        review_repo.clone(),
        cache.clone(),
    ));
    let post_service = Arc::new(PostService::new(post_repo.clone(), cache.clone()));
    let comment_service = Arc::new(CommentService::new(
        SqlxCommentRepository::boxed(pool.clone()),
        post_repo.clone(),
        config.moderation.clone(),
    ));
    let content_service = Arc::new(ContentService::new(content_repo.clone(), cache.clone()));
    let submission_service = Arc::new(SubmissionService::new(
        SqlxSubmissionRepository::boxed(pool.clone()),
        user_repo.clone(),
        mentor_service.clone(),
    ));
    let booking_service = Arc::new(BookingService::new(
        booking_repo.clone(),
        mentor_repo.clone(),
        email,
    ));
    let review_service = Arc::new(ReviewService::new(
        review_repo,
        mentor_repo.clone(),
        booking_repo,
        cache.clone(),
    ));
    let home_service = Arc::new(HomeService::new(
        content_repo,
        post_repo,
        mentor_service.clone(),
        cache,
    ));
    let dashboard_service = Arc::new(DashboardService::new(
        user_repo,
        mentor_repo,
        post_service.clone(),
        comment_service.clone(),
        submission_service.clone(),
        booking_service.clone(),
    ));
    let rpc_service = Arc::new(RpcService::new(
        mentor_service.clone(),
        post_service.clone(),
        home_service.clone(),
        submission_service.clone(),
        user_service.clone(),
        dashboard_service.clone(),
    ));
    let storage_service = Arc::new(StorageService::new(
        config.storage.clone(),
        config.server.public_url.clone(),
    ));
    let pages = PageRenderer::new(config.server.site_name.clone())
        .context("Failed to load page templates")?;

    Ok(AppState {
        user_service,
        mentor_service,
        post_service,
        comment_service,
        content_service,
        submission_service,
        booking_service,
        review_service,
        storage_service,
        home_service,
        dashboard_service,
        rpc_service,
        rate_limiter: Arc::new(LoginRateLimiter::new()),
        pages: Arc::new(pages),
        request_stats: Arc::new(RequestStats::new()),
    })
}

/// Periodic cleanup: rate limiter windows every 5 minutes, expired sessions
/// and sign-in codes every hour
pub fn spawn_maintenance(state: &AppState) {
    let limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            limiter.cleanup().await;
        }
    });

    let users = state.user_service.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match users.cleanup_expired().await {
                Ok((sessions, codes)) if sessions + codes > 0 => {
                    tracing::info!("Purged {} expired sessions and {} sign-in codes", sessions, codes);
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Session purge failed: {}", e),
            }
        }
    });
}
