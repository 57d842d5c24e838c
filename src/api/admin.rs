//! Back-office overview endpoints
//!
//! - GET /api/v1/admin/dashboard - Moderation and roster counters
//! - GET /api/v1/admin/stats - Process memory, uptime and request stats
//! - POST /api/v1/admin/cache/home - Drop the cached home page payload

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::process;
use sysinfo::{Pid, System};

use crate::api::middleware::{ApiError, AppState};
use crate::services::Dashboard;

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub struct SystemStatsResponse {
    pub version: String,
    /// Process resident memory in bytes
    pub memory_bytes: u64,
    pub memory_formatted: String,
    pub system_total_memory: u64,
    pub system_used_memory: u64,
    pub os_name: String,
    pub uptime_seconds: u64,
    /// e.g. "2h 15m"
    pub uptime_formatted: String,
    pub total_requests: u64,
    pub avg_response_time_ms: f64,
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/stats", get(get_system_stats))
        .route("/cache/home", post(invalidate_home))
}

async fn get_dashboard(State(state): State<AppState>) -> Result<Json<Dashboard>, ApiError> {
    Ok(Json(state.dashboard_service.load().await?))
}

async fn get_system_stats(State(state): State<AppState>) -> Json<SystemStatsResponse> {
    let mut sys = System::new_all();
    sys.refresh_all();

    let pid = Pid::from_u32(process::id());
    let memory_bytes = sys.process(pid).map(|p| p.memory()).unwrap_or(0);

    let uptime_seconds = state.request_stats.uptime_seconds();

    Json(SystemStatsResponse {
        version: APP_VERSION.to_string(),
        memory_bytes,
        memory_formatted: format_bytes(memory_bytes),
        system_total_memory: sys.total_memory(),
        system_used_memory: sys.used_memory(),
        os_name: System::name().unwrap_or_else(|| "Unknown".to_string()),
        uptime_seconds,
        uptime_formatted: format_uptime(uptime_seconds),
        total_requests: state.request_stats.total_requests(),
        avg_response_time_ms: state.request_stats.avg_response_time_us() / 1000.0,
    })
}

async fn invalidate_home(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.home_service.invalidate().await?;
    Ok(StatusCode::NO_CONTENT)
}

fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", seconds)
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
