//! The signed-in user's own artist profile and inbox of inquiries

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{JsonBody, PaginationQuery, PathParam, QueryParams};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, CurrentArtist};
use crate::models::{Artist, CreateArtistInput, Inquiry, InquiryStatus, PagedResult, UpdateArtistInput};

#[derive(Debug, Deserialize)]
pub struct InquiryListQuery {
    pub status: Option<InquiryStatus>,
}

#[derive(Debug, Deserialize)]
pub struct InquiryStatusRequest {
    pub status: InquiryStatus,
}

/// Build the profile router (requires auth middleware)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me/artist", post(create_artist).put(update_artist))
        .route("/me/artist/submit", post(submit))
        .route("/me/artist/withdraw", post(withdraw))
        .route("/me/inquiries", get(list_inquiries))
        .route("/me/inquiries/{id}/status", put(set_inquiry_status))
}

/// POST /api/v1/me/artist
async fn create_artist(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    JsonBody(body): JsonBody<CreateArtistInput>,
) -> Result<(StatusCode, Json<Artist>), ApiError> {
    let artist = state.artist_service.create_profile(&user, body).await?;
    Ok((StatusCode::CREATED, Json(artist)))
}

/// PUT /api/v1/me/artist - Partial update
async fn update_artist(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    JsonBody(body): JsonBody<UpdateArtistInput>,
) -> Result<Json<Artist>, ApiError> {
    Ok(Json(state.artist_service.update_profile(&user, body).await?))
}

/// POST /api/v1/me/artist/submit - Send a draft for review
async fn submit(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Artist>, ApiError> {
    Ok(Json(state.artist_service.submit(&user).await?))
}

/// POST /api/v1/me/artist/withdraw - Pull a pending profile back to draft
async fn withdraw(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Artist>, ApiError> {
    Ok(Json(state.artist_service.withdraw(&user).await?))
}

/// GET /api/v1/me/inquiries
async fn list_inquiries(
    State(state): State<AppState>,
    current: CurrentArtist,
    QueryParams(query): QueryParams<InquiryListQuery>,
    QueryParams(page): QueryParams<PaginationQuery>,
) -> Result<Json<PagedResult<Inquiry>>, ApiError> {
    let inquiries = state
        .inquiry_service
        .list_for_owner(&current.artist, query.status, &page.params())
        .await?;
    Ok(Json(inquiries))
}

/// PUT /api/v1/me/inquiries/{id}/status
async fn set_inquiry_status(
    State(state): State<AppState>,
    current: CurrentArtist,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<InquiryStatusRequest>,
) -> Result<Json<Inquiry>, ApiError> {
    let inquiry = state
        .inquiry_service
        .set_status(&current.artist, id, body.status)
        .await?;
    Ok(Json(inquiry))
}
