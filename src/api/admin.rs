//! Admin API endpoints
//!
//! Moderation console and platform configuration:
//! - Dashboard with platform counts and process stats
//! - Artist listing across all statuses, status changes, featuring, bulk actions
//! - Removal of portfolio items
//! - Platform settings

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::process;
use sysinfo::{Pid, System};

use crate::api::common::{JsonBody, PaginationQuery, PathParam, QueryParams};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Artist, ArtistFilter, ArtistStatus, Location, Medium, PagedResult};
use crate::services::{BulkRequest, BulkResult, PlatformCounts, PlatformSettings, UpdateSettingsInput};

/// App version constant - update when releasing
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub counts: PlatformCounts,
    pub system: SystemStats,
}

/// Process and request statistics
#[derive(Debug, Serialize)]
pub struct SystemStats {
    pub version: String,
    /// Process memory usage in bytes
    pub memory_bytes: u64,
    /// Process memory usage formatted (e.g., "45.2 MB")
    pub memory_formatted: String,
    pub uptime_seconds: u64,
    /// Uptime formatted (e.g., "2h 15m")
    pub uptime_formatted: String,
    pub total_requests: u64,
    pub avg_response_time_ms: f64,
}

#[derive(Debug, Deserialize)]
pub struct AdminArtistQuery {
    pub status: Option<ArtistStatus>,
    pub medium: Option<Medium>,
    pub location: Option<Location>,
    pub q: Option<String>,
    #[serde(default)]
    pub featured_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ArtistStatus,
}

#[derive(Debug, Deserialize)]
pub struct FeaturedRequest {
    pub featured: bool,
}

/// Build the admin router (requires auth and admin middleware)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/artists", get(list_artists))
        .route("/artists/bulk", post(bulk_action))
        .route("/artists/{id}/status", put(set_status))
        .route("/artists/{id}/featured", put(set_featured))
        .route("/portfolio/{id}", delete(delete_portfolio_item))
        .route("/settings", get(get_settings).put(update_settings))
}

/// GET /api/v1/admin/dashboard
async fn get_dashboard(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<DashboardResponse>, ApiError> {
    let counts = state
        .stats_service
        .counts()
        .await
        .map_err(|e| ApiError::internal_error(format!("{:#}", e)))?;

    let mut sys = System::new_all();
    sys.refresh_all();
    let memory_bytes = sys
        .process(Pid::from_u32(process::id()))
        .map(|p| p.memory())
        .unwrap_or(0);

    let uptime_seconds = state.request_stats.uptime_seconds();
    Ok(Json(DashboardResponse {
        counts,
        system: SystemStats {
            version: APP_VERSION.to_string(),
            memory_bytes,
            memory_formatted: format_bytes(memory_bytes),
            uptime_seconds,
            uptime_formatted: format_uptime(uptime_seconds),
            total_requests: state.request_stats.total_requests(),
            avg_response_time_ms: state.request_stats.avg_response_time_us() / 1000.0,
        },
    }))
}

/// GET /api/v1/admin/artists - Every status unless `status` is given
async fn list_artists(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<AdminArtistQuery>,
    QueryParams(page): QueryParams<PaginationQuery>,
) -> Result<Json<PagedResult<Artist>>, ApiError> {
    let filter = ArtistFilter {
        status: query.status,
        medium: query.medium,
        location: query.location,
        q: query.q.filter(|q| !q.trim().is_empty()),
        featured_only: query.featured_only,
    };
    Ok(Json(state.moderation_service.list(&filter, &page.params()).await?))
}

/// PUT /api/v1/admin/artists/{id}/status
async fn set_status(
    State(state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<StatusRequest>,
) -> Result<Json<Artist>, ApiError> {
    let artist = state.moderation_service.set_status(id, body.status).await?;
    tracing::info!("Admin {} set artist {} to {}", admin.id, id, artist.status);
    Ok(Json(artist))
}

/// PUT /api/v1/admin/artists/{id}/featured
async fn set_featured(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<FeaturedRequest>,
) -> Result<Json<Artist>, ApiError> {
    Ok(Json(state.moderation_service.set_featured(id, body.featured).await?))
}

/// POST /api/v1/admin/artists/bulk
///
/// Always 200; per-id outcomes are in the body.
async fn bulk_action(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<BulkRequest>,
) -> Json<BulkResult> {
    Json(state.moderation_service.bulk(&body).await)
}

/// DELETE /api/v1/admin/portfolio/{id}
async fn delete_portfolio_item(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> Result<StatusCode, ApiError> {
    state.moderation_service.delete_portfolio_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<PlatformSettings>, ApiError> {
    Ok(Json(state.settings_service.get_all().await?))
}

async fn update_settings(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<UpdateSettingsInput>,
) -> Result<Json<PlatformSettings>, ApiError> {
    Ok(Json(state.settings_service.update(body).await?))
}

/// Format uptime to human readable string
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

/// Format bytes to human readable string
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
