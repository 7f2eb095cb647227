//! Portfolio service

use anyhow::Context;
use chrono::Datelike;
use serde_json::json;
use std::sync::Arc;

use crate::db::now;
use crate::db::repositories::{ActivityRepository, ArtistRepository, PortfolioRepository};
use crate::models::{
    ActivityKind, Artist, ListParams, NewActivity, PagedResult, PortfolioItem, PortfolioItemInput, User,
};
use crate::services::content::{ensure_owner, ensure_visible, ContentServiceError};
use crate::services::validation::FieldErrors;

const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 2000;
const EARLIEST_YEAR: i32 = 1800;

pub struct PortfolioService {
    portfolio_repo: Arc<dyn PortfolioRepository>,
    artist_repo: Arc<dyn ArtistRepository>,
    activity_repo: Arc<dyn ActivityRepository>,
}

impl PortfolioService {
    pub fn new(
        portfolio_repo: Arc<dyn PortfolioRepository>,
        artist_repo: Arc<dyn ArtistRepository>,
        activity_repo: Arc<dyn ActivityRepository>,
    ) -> Self {
        Self {
            portfolio_repo,
            artist_repo,
            activity_repo,
        }
    }

    /// Add an item to the owner's portfolio and record a `portfolio_added` activity
    pub async fn create(&self, owner: &Artist, input: PortfolioItemInput) -> Result<PortfolioItem, ContentServiceError> {
        validate(&input)?;
        let item = self
            .portfolio_repo
            .create(owner.id, &input)
            .await
            .context("Failed to create portfolio item")?;

        self.activity_repo
            .create(&NewActivity {
                artist_id: owner.id,
                kind: ActivityKind::PortfolioAdded,
                portfolio_item_id: Some(item.id),
                payload: json!({
                    "item_id": item.id,
                    "title": item.title,
                    "image_url": item.image_url,
                }),
            })
            .await
            .context("Failed to record portfolio activity")?;

        Ok(item)
    }

    /// Replace every editable field of an owned item
    pub async fn update(
        &self,
        owner: &Artist,
        id: i64,
        input: PortfolioItemInput,
    ) -> Result<PortfolioItem, ContentServiceError> {
        let item = self.load(id).await?;
        ensure_owner(owner, item.artist_id, "portfolio items")?;
        validate(&input)?;
        self.portfolio_repo
            .update(id, &input)
            .await
            .context("Failed to update portfolio item")?
            .ok_or_else(|| not_found(id))
    }

    /// Delete an owned item; activities that mention it stay
    pub async fn delete(&self, owner: &Artist, id: i64) -> Result<(), ContentServiceError> {
        let item = self.load(id).await?;
        ensure_owner(owner, item.artist_id, "portfolio items")?;
        self.portfolio_repo
            .delete(id)
            .await
            .context("Failed to delete portfolio item")?;
        Ok(())
    }

    pub async fn get(&self, id: i64, viewer: Option<&User>) -> Result<PortfolioItem, ContentServiceError> {
        let item = self.load(id).await?;
        let artist = self
            .artist_repo
            .get_by_id(item.artist_id)
            .await
            .context("Failed to load artist")?;
        ensure_visible(artist.as_ref(), viewer, || format!("Portfolio item {} not found", id))?;
        Ok(item)
    }

    /// Items of an artist the caller has already been allowed to see
    pub async fn list_for_artist(
        &self,
        artist: &Artist,
        params: &ListParams,
    ) -> Result<PagedResult<PortfolioItem>, ContentServiceError> {
        let (items, total) = self
            .portfolio_repo
            .list_by_artist(artist.id, params)
            .await
            .context("Failed to list portfolio items")?;
        Ok(PagedResult::new(items, total, params))
    }

    async fn load(&self, id: i64) -> Result<PortfolioItem, ContentServiceError> {
        self.portfolio_repo
            .get_by_id(id)
            .await
            .context("Failed to load portfolio item")?
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: i64) -> ContentServiceError {
    ContentServiceError::NotFound(format!("Portfolio item {} not found", id))
}

fn validate(input: &PortfolioItemInput) -> Result<(), ContentServiceError> {
    let mut errors = FieldErrors::new();
    errors.require_text("title", &input.title, MAX_TITLE_LEN);
    errors.max_len("description", &input.description, MAX_DESCRIPTION_LEN);
    errors.url("image_url", &input.image_url);
    if let Some(year) = input.year {
        let latest = now().year() + 1;
        if !(EARLIEST_YEAR..=latest).contains(&year) {
            errors.add("year", format!("must be between {} and {}", EARLIEST_YEAR, latest));
        }
    }
    errors.into_result().map_err(ContentServiceError::ValidationError)
}
