//! Public artist endpoints
//!
//! Directory, profile pages and everything hanging off a profile. Profiles
//! that are not approved are visible to their owner and admins only; for
//! anyone else they do not exist.

use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;

use crate::api::common::{PaginationQuery, PathParam, QueryParams};
use crate::api::middleware::{ApiError, AppState, MaybeUser};
use crate::models::{
    Artist, ArtistFilter, ArtistSummary, Event, Location, Medium, PagedResult, PortfolioItem, ServiceListing,
};
use crate::services::scoring::{SimilarArtist, TrendingArtist};
use crate::services::{taxonomy, Taxonomy};

#[derive(Debug, Deserialize)]
pub struct DirectoryQuery {
    pub medium: Option<Medium>,
    pub location: Option<Location>,
    pub q: Option<String>,
    #[serde(default)]
    pub featured_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// Build the public artist router (optional auth)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/artists", get(directory))
        .route("/artists/trending", get(trending))
        .route("/artists/{slug}", get(get_artist))
        .route("/artists/{slug}/similar", get(similar))
        .route("/artists/{slug}/portfolio", get(portfolio))
        .route("/artists/{slug}/events", get(events))
        .route("/artists/{slug}/services", get(services))
        .route("/artists/{slug}/followers", get(followers))
        .route("/artists/{slug}/following", get(following))
        .route("/taxonomy", get(get_taxonomy))
}

/// GET /api/v1/artists
async fn directory(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<DirectoryQuery>,
    QueryParams(page): QueryParams<PaginationQuery>,
) -> Result<Json<PagedResult<Artist>>, ApiError> {
    let filter = ArtistFilter {
        medium: query.medium,
        location: query.location,
        q: query.q.filter(|q| !q.trim().is_empty()),
        featured_only: query.featured_only,
        ..ArtistFilter::public()
    };
    let result = state.artist_service.directory(filter, &page.params()).await?;
    Ok(Json(result))
}

/// GET /api/v1/artists/trending
async fn trending(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<LimitQuery>,
) -> Result<Json<Vec<TrendingArtist>>, ApiError> {
    Ok(Json(state.discovery_service.trending(query.limit).await?))
}

async fn visible_artist(state: &AppState, slug: &str, viewer: &MaybeUser) -> Result<Artist, ApiError> {
    Ok(state.artist_service.get_visible(slug, viewer.0.as_ref()).await?)
}

/// GET /api/v1/artists/{slug}
async fn get_artist(
    State(state): State<AppState>,
    viewer: MaybeUser,
    PathParam(slug): PathParam<String>,
) -> Result<Json<Artist>, ApiError> {
    Ok(Json(visible_artist(&state, &slug, &viewer).await?))
}

/// GET /api/v1/artists/{slug}/similar
async fn similar(
    State(state): State<AppState>,
    viewer: MaybeUser,
    PathParam(slug): PathParam<String>,
    QueryParams(query): QueryParams<LimitQuery>,
) -> Result<Json<Vec<SimilarArtist>>, ApiError> {
    let artist = visible_artist(&state, &slug, &viewer).await?;
    Ok(Json(state.discovery_service.similar(&artist, query.limit).await?))
}

/// GET /api/v1/artists/{slug}/portfolio
async fn portfolio(
    State(state): State<AppState>,
    viewer: MaybeUser,
    PathParam(slug): PathParam<String>,
    QueryParams(page): QueryParams<PaginationQuery>,
) -> Result<Json<PagedResult<PortfolioItem>>, ApiError> {
    let artist = visible_artist(&state, &slug, &viewer).await?;
    let items = state.portfolio_service.list_for_artist(&artist, &page.params()).await?;
    Ok(Json(items))
}

/// GET /api/v1/artists/{slug}/events
async fn events(
    State(state): State<AppState>,
    viewer: MaybeUser,
    PathParam(slug): PathParam<String>,
    QueryParams(page): QueryParams<PaginationQuery>,
) -> Result<Json<PagedResult<Event>>, ApiError> {
    let artist = visible_artist(&state, &slug, &viewer).await?;
    let events = state.event_service.list_for_artist(&artist, &page.params()).await?;
    Ok(Json(events))
}

/// GET /api/v1/artists/{slug}/services
///
/// Inactive listings are included only for the owner.
async fn services(
    State(state): State<AppState>,
    viewer: MaybeUser,
    PathParam(slug): PathParam<String>,
) -> Result<Json<Vec<ServiceListing>>, ApiError> {
    let artist = visible_artist(&state, &slug, &viewer).await?;
    let listings = state.listing_service.list_for_artist(&artist, viewer.0.as_ref()).await?;
    Ok(Json(listings))
}

/// GET /api/v1/artists/{slug}/followers
async fn followers(
    State(state): State<AppState>,
    viewer: MaybeUser,
    PathParam(slug): PathParam<String>,
    QueryParams(page): QueryParams<PaginationQuery>,
) -> Result<Json<PagedResult<ArtistSummary>>, ApiError> {
    let artist = visible_artist(&state, &slug, &viewer).await?;
    Ok(Json(state.social_service.followers(artist.id, &page.params()).await?))
}

/// GET /api/v1/artists/{slug}/following
async fn following(
    State(state): State<AppState>,
    viewer: MaybeUser,
    PathParam(slug): PathParam<String>,
    QueryParams(page): QueryParams<PaginationQuery>,
) -> Result<Json<PagedResult<ArtistSummary>>, ApiError> {
    let artist = visible_artist(&state, &slug, &viewer).await?;
    Ok(Json(state.social_service.following(artist.id, &page.params()).await?))
}

/// GET /api/v1/taxonomy - Media and locations with display labels
async fn get_taxonomy() -> Json<Taxonomy> {
    Json(taxonomy())
}
