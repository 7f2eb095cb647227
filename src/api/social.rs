//! Follow and like endpoints
//!
//! All of them act on behalf of the caller's artist profile and answer with
//! the resulting state, so repeating a request is harmless.

use axum::{extract::State, routing::get, Json, Router};

use crate::api::common::PathParam;
use crate::api::middleware::{ApiError, AppState, CurrentArtist};
use crate::models::{FollowState, LikeState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/follows/{artist_id}",
            get(follow_state).post(follow).delete(unfollow),
        )
        .route("/likes/{item_id}", get(like_state).post(like).delete(unlike))
}

async fn follow_state(
    State(state): State<AppState>,
    current: CurrentArtist,
    PathParam(artist_id): PathParam<i64>,
) -> Result<Json<FollowState>, ApiError> {
    Ok(Json(state.social_service.follow_state(&current.artist, artist_id).await?))
}

async fn follow(
    State(state): State<AppState>,
    current: CurrentArtist,
    PathParam(artist_id): PathParam<i64>,
) -> Result<Json<FollowState>, ApiError> {
    Ok(Json(state.social_service.follow(&current.artist, artist_id).await?))
}

async fn unfollow(
    State(state): State<AppState>,
    current: CurrentArtist,
    PathParam(artist_id): PathParam<i64>,
) -> Result<Json<FollowState>, ApiError> {
    Ok(Json(state.social_service.unfollow(&current.artist, artist_id).await?))
}

async fn like_state(
    State(state): State<AppState>,
    current: CurrentArtist,
    PathParam(item_id): PathParam<i64>,
) -> Result<Json<LikeState>, ApiError> {
    Ok(Json(state.social_service.like_state(&current.artist, item_id).await?))
}

async fn like(
    State(state): State<AppState>,
    current: CurrentArtist,
    PathParam(item_id): PathParam<i64>,
) -> Result<Json<LikeState>, ApiError> {
    Ok(Json(state.social_service.like(&current.artist, item_id).await?))
}

async fn unlike(
    State(state): State<AppState>,
    current: CurrentArtist,
    PathParam(item_id): PathParam<i64>,
) -> Result<Json<LikeState>, ApiError> {
    Ok(Json(state.social_service.unlike(&current.artist, item_id).await?))
}
