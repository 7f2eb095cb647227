//! Public site settings

use axum::{extract::State, routing::get, Json, Router};

use crate::api::middleware::{ApiError, AppState};
use crate::services::PublicSettings;

pub fn router() -> Router<AppState> {
    Router::new().route("/settings", get(get_public_settings))
}

/// GET /api/v1/settings - Name, description and whether sign-up is open
async fn get_public_settings(State(state): State<AppState>) -> Result<Json<PublicSettings>, ApiError> {
    Ok(Json(state.settings_service.get_public().await?))
}
