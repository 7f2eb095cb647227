//! Event API endpoints

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::{JsonBody, PaginationQuery, PathParam, QueryParams};
use crate::api::middleware::{ApiError, AppState, CurrentArtist, MaybeUser};
use crate::models::{Event, EventInput, PagedResult};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/events", get(upcoming))
        .route("/events/{id}", get(get_event))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event))
        .route("/events/{id}", put(update_event).delete(delete_event))
}

/// GET /api/v1/events - Upcoming events of approved artists, soonest first
async fn upcoming(
    State(state): State<AppState>,
    QueryParams(page): QueryParams<PaginationQuery>,
) -> Result<Json<PagedResult<Event>>, ApiError> {
    Ok(Json(state.event_service.upcoming(&page.params()).await?))
}

async fn get_event(
    State(state): State<AppState>,
    viewer: MaybeUser,
    PathParam(id): PathParam<i64>,
) -> Result<Json<Event>, ApiError> {
    Ok(Json(state.event_service.get(id, viewer.0.as_ref()).await?))
}

async fn create_event(
    State(state): State<AppState>,
    current: CurrentArtist,
    JsonBody(body): JsonBody<EventInput>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let event = state.event_service.create(&current.artist, body).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn update_event(
    State(state): State<AppState>,
    current: CurrentArtist,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<EventInput>,
) -> Result<Json<Event>, ApiError> {
    Ok(Json(state.event_service.update(&current.artist, id, body).await?))
}

async fn delete_event(
    State(state): State<AppState>,
    current: CurrentArtist,
    PathParam(id): PathParam<i64>,
) -> Result<StatusCode, ApiError> {
    state.event_service.delete(&current.artist, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
