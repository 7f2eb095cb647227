//! Upload API endpoints
//!
//! Images for avatars and portfolio items. Stored files are served back
//! under `/uploads/`.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::services::FieldErrors;

/// Multipart framing allowance on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Response for successful upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
}

/// Build the upload router
pub fn router(max_file_size: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    Router::new()
        .route("/upload/image", post(upload_image))
        .layer(DefaultBodyLimit::max(body_limit))
}

/// POST /api/v1/upload/image - Upload a single image
///
/// Accepts multipart/form-data with a single file field named "file".
async fn upload_image(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let config = &state.upload_config;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        if !config.is_type_allowed(&content_type) {
            return Err(ApiError::validation_error(FieldErrors::single(
                "file",
                format!(
                    "type {} is not allowed (allowed: {})",
                    content_type,
                    config.allowed_types.join(", ")
                ),
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?;

        if data.len() as u64 > config.max_file_size {
            return Err(ApiError::validation_error(FieldErrors::single(
                "file",
                format!("must be at most {} bytes", config.max_file_size),
            )));
        }

        ensure_upload_dir(&config.path).await?;
        let filename = format!("{}.{}", Uuid::new_v4(), config.get_extension(&content_type));
        fs::write(config.path.join(&filename), &data)
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to save file: {}", e)))?;

        tracing::info!("User {} uploaded {} ({} bytes)", user.id, filename, data.len());
        return Ok(Json(UploadResponse {
            url: format!("/uploads/{}", filename),
            filename,
            size: data.len() as u64,
            content_type,
        }));
    }

    Err(ApiError::validation_error(FieldErrors::single("file", "is required")))
}

async fn ensure_upload_dir(path: &Path) -> Result<(), ApiError> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to create upload dir: {}", e)))
}
