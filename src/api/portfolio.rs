//! Portfolio API endpoints
//!
//! - GET /api/v1/portfolio/{id} - One item (public)
//! - POST /api/v1/portfolio - Add an item to the caller's portfolio
//! - PUT /api/v1/portfolio/{id} - Replace an item
//! - DELETE /api/v1/portfolio/{id} - Remove an item

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::{JsonBody, PathParam};
use crate::api::middleware::{ApiError, AppState, CurrentArtist, MaybeUser};
use crate::models::{PortfolioItem, PortfolioItemInput};

pub fn public_router() -> Router<AppState> {
    Router::new().route("/portfolio/{id}", get(get_item))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/portfolio", post(create_item))
        .route("/portfolio/{id}", put(update_item).delete(delete_item))
}

async fn get_item(
    State(state): State<AppState>,
    viewer: MaybeUser,
    PathParam(id): PathParam<i64>,
) -> Result<Json<PortfolioItem>, ApiError> {
    Ok(Json(state.portfolio_service.get(id, viewer.0.as_ref()).await?))
}

async fn create_item(
    State(state): State<AppState>,
    current: CurrentArtist,
    JsonBody(body): JsonBody<PortfolioItemInput>,
) -> Result<(StatusCode, Json<PortfolioItem>), ApiError> {
    let item = state.portfolio_service.create(&current.artist, body).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    State(state): State<AppState>,
    current: CurrentArtist,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<PortfolioItemInput>,
) -> Result<Json<PortfolioItem>, ApiError> {
    Ok(Json(state.portfolio_service.update(&current.artist, id, body).await?))
}

async fn delete_item(
    State(state): State<AppState>,
    current: CurrentArtist,
    PathParam(id): PathParam<i64>,
) -> Result<StatusCode, ApiError> {
    state.portfolio_service.delete(&current.artist, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
