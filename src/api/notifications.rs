//! Notification inbox and activity feed of the caller's artist profile

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::common::{PaginationQuery, PathParam, QueryParams};
use crate::api::middleware::{ApiError, AppState, CurrentArtist};
use crate::models::{FeedPage, Notification, PagedResult};

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/{id}/read", post(mark_read))
        .route("/feed", get(feed))
}

/// GET /api/v1/notifications?unread_only=&page=&page_size=
async fn list_notifications(
    State(state): State<AppState>,
    current: CurrentArtist,
    QueryParams(query): QueryParams<NotificationQuery>,
    QueryParams(page): QueryParams<PaginationQuery>,
) -> Result<Json<PagedResult<Notification>>, ApiError> {
    let notifications = state
        .notification_service
        .list(current.artist.id, query.unread_only, &page.params())
        .await?;
    Ok(Json(notifications))
}

async fn unread_count(
    State(state): State<AppState>,
    current: CurrentArtist,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let count = state.notification_service.unread_count(current.artist.id).await?;
    Ok(Json(UnreadCountResponse { count }))
}

async fn mark_read(
    State(state): State<AppState>,
    current: CurrentArtist,
    PathParam(id): PathParam<i64>,
) -> Result<StatusCode, ApiError> {
    state.notification_service.mark_read(id, current.artist.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_all_read(
    State(state): State<AppState>,
    current: CurrentArtist,
) -> Result<Json<MarkAllReadResponse>, ApiError> {
    let updated = state.notification_service.mark_all_read(current.artist.id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

/// GET /api/v1/feed?cursor=&limit=
///
/// Pass the previous page's `next_cursor` to continue.
async fn feed(
    State(state): State<AppState>,
    current: CurrentArtist,
    QueryParams(query): QueryParams<FeedQuery>,
) -> Result<Json<FeedPage>, ApiError> {
    let page = state
        .feed_service
        .feed(&current.artist, query.cursor.as_deref(), query.limit)
        .await?;
    Ok(Json(page))
}
