//! Service listing API endpoints
//!
//! Listings are what an artist offers (commissions, workshops, ...).
//! Inquiries about a listing can be sent without an account; they are
//! rate limited per client address.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::{JsonBody, PathParam};
use crate::api::middleware::{ApiError, AppState, ClientIp, CurrentArtist, MaybeUser};
use crate::models::{Inquiry, InquiryInput, ServiceListing, ServiceListingInput};

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/services/{id}", get(get_listing))
        .route("/services/{id}/inquiries", post(submit_inquiry))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/services", post(create_listing))
        .route("/services/{id}", put(update_listing).delete(delete_listing))
}

async fn get_listing(
    State(state): State<AppState>,
    viewer: MaybeUser,
    PathParam(id): PathParam<i64>,
) -> Result<Json<ServiceListing>, ApiError> {
    Ok(Json(state.listing_service.get(id, viewer.0.as_ref()).await?))
}

async fn create_listing(
    State(state): State<AppState>,
    current: CurrentArtist,
    JsonBody(body): JsonBody<ServiceListingInput>,
) -> Result<(StatusCode, Json<ServiceListing>), ApiError> {
    let listing = state.listing_service.create(&current.artist, body).await?;
    Ok((StatusCode::CREATED, Json(listing)))
}

async fn update_listing(
    State(state): State<AppState>,
    current: CurrentArtist,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<ServiceListingInput>,
) -> Result<Json<ServiceListing>, ApiError> {
    Ok(Json(state.listing_service.update(&current.artist, id, body).await?))
}

async fn delete_listing(
    State(state): State<AppState>,
    current: CurrentArtist,
    PathParam(id): PathParam<i64>,
) -> Result<StatusCode, ApiError> {
    state.listing_service.delete(&current.artist, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/services/{id}/inquiries
async fn submit_inquiry(
    State(state): State<AppState>,
    ClientIp(client): ClientIp,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<InquiryInput>,
) -> Result<(StatusCode, Json<Inquiry>), ApiError> {
    let inquiry = state.inquiry_service.submit(id, body, &client).await?;
    Ok((StatusCode::CREATED, Json(inquiry)))
}
