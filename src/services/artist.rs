//! Artist profile service
//!
//! Profile creation and editing by owners, submit/withdraw of the profile
//! for review, the public directory and visibility rules for profile pages.

use anyhow::Context;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::db::now;
use crate::db::repositories::{ActivityRepository, ArtistRepository};
use crate::models::{
    ActivityKind, Artist, ArtistFilter, ArtistStatus, CreateArtistInput, ListParams, Location,
    Medium, NewActivity, PagedResult, UpdateArtistInput, User,
};
use crate::services::moderation::{check_transition, Actor};
use crate::services::settings::{SettingsService, SettingsServiceError};
use crate::services::validation::{slugify, FieldErrors};

const MAX_NAME_LEN: usize = 100;
const MAX_BIO_LEN: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum ArtistServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<SettingsServiceError> for ArtistServiceError {
    fn from(err: SettingsServiceError) -> Self {
        match err {
            SettingsServiceError::ValidationError(fields) => ArtistServiceError::ValidationError(fields),
            SettingsServiceError::InternalError(e) => ArtistServiceError::InternalError(e),
        }
    }
}

/// One selectable taxonomy value
#[derive(Debug, Clone, Serialize)]
pub struct TaxonomyEntry {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Taxonomy {
    pub media: Vec<TaxonomyEntry>,
    pub locations: Vec<TaxonomyEntry>,
}

/// Media and locations offered by the directory filters
pub fn taxonomy() -> Taxonomy {
    Taxonomy {
        media: Medium::ALL
            .iter()
            .map(|m| TaxonomyEntry {
                value: m.as_str(),
                label: m.label(),
            })
            .collect(),
        locations: Location::ALL
            .iter()
            .map(|l| TaxonomyEntry {
                value: l.as_str(),
                label: l.label(),
            })
            .collect(),
    }
}

pub struct ArtistService {
    artist_repo: Arc<dyn ArtistRepository>,
    activity_repo: Arc<dyn ActivityRepository>,
    settings: Arc<SettingsService>,
}

impl ArtistService {
    pub fn new(
        artist_repo: Arc<dyn ArtistRepository>,
        activity_repo: Arc<dyn ActivityRepository>,
        settings: Arc<SettingsService>,
    ) -> Self {
        Self {
            artist_repo,
            activity_repo,
            settings,
        }
    }

    /// Create the caller's profile
    ///
    /// A user owns at most one profile. It starts as `draft`, or `pending`
    /// when profiles are submitted for review automatically.
    pub async fn create_profile(&self, user: &User, input: CreateArtistInput) -> Result<Artist, ArtistServiceError> {
        if self.get_own(user).await?.is_some() {
            return Err(ArtistServiceError::BadRequest(
                "You already have an artist profile".to_string(),
            ));
        }

        let mut errors = FieldErrors::new();
        errors.require_text("name", &input.name, MAX_NAME_LEN);
        if let Some(bio) = &input.bio {
            errors.max_len("bio", bio, MAX_BIO_LEN);
        }
        check_links(
            &mut errors,
            input.avatar_url.as_deref(),
            input.website.as_deref(),
            input.contact_email.as_deref(),
        );
        errors.into_result().map_err(ArtistServiceError::ValidationError)?;

        let status = if self.settings.auto_submit_profiles().await? {
            ArtistStatus::Pending
        } else {
            ArtistStatus::Draft
        };
        let name = input.name.trim().to_string();
        let slug = self.unique_slug(&name).await?;
        let ts = now();
        let artist = Artist {
            id: 0,
            user_id: user.id,
            slug,
            name,
            bio: input.bio.map(|b| b.trim().to_string()).unwrap_or_default(),
            avatar_url: non_empty(input.avatar_url),
            website: non_empty(input.website),
            contact_email: non_empty(input.contact_email),
            primary_medium: input.primary_medium,
            location: input.location,
            status,
            featured: false,
            follower_count: 0,
            following_count: 0,
            created_at: ts,
            updated_at: ts,
        };

        let created = self
            .artist_repo
            .create(&artist)
            .await
            .context("Failed to create artist profile")?;
        tracing::info!("Created artist profile {} ({}) for user {}", created.id, created.slug, user.id);
        Ok(created)
    }

    /// Apply a partial update to the caller's profile
    ///
    /// The slug stays fixed after creation so profile URLs keep working.
    pub async fn update_profile(&self, user: &User, input: UpdateArtistInput) -> Result<Artist, ArtistServiceError> {
        let mut artist = self.require_own(user).await?;
        if input.is_empty() {
            return Ok(artist);
        }

        let mut errors = FieldErrors::new();
        if let Some(name) = &input.name {
            errors.require_text("name", name, MAX_NAME_LEN);
        }
        if let Some(bio) = &input.bio {
            errors.max_len("bio", bio, MAX_BIO_LEN);
        }
        check_links(
            &mut errors,
            input.avatar_url.as_deref(),
            input.website.as_deref(),
            input.contact_email.as_deref(),
        );
        errors.into_result().map_err(ArtistServiceError::ValidationError)?;

        let mut changed = Vec::new();
        if let Some(name) = input.name {
            artist.name = name.trim().to_string();
            changed.push("name");
        }
        if let Some(bio) = input.bio {
            artist.bio = bio.trim().to_string();
            changed.push("bio");
        }
        if let Some(avatar_url) = input.avatar_url {
            artist.avatar_url = non_empty(Some(avatar_url));
            changed.push("avatar_url");
        }
        if let Some(website) = input.website {
            artist.website = non_empty(Some(website));
            changed.push("website");
        }
        if let Some(contact_email) = input.contact_email {
            artist.contact_email = non_empty(Some(contact_email));
            changed.push("contact_email");
        }
        if let Some(medium) = input.primary_medium {
            artist.primary_medium = medium;
            changed.push("primary_medium");
        }
        if let Some(location) = input.location {
            artist.location = location;
            changed.push("location");
        }

        let updated = self
            .artist_repo
            .update_profile(&artist)
            .await
            .context("Failed to update artist profile")?;

        self.activity_repo
            .create(&NewActivity {
                artist_id: updated.id,
                kind: ActivityKind::ProfileUpdated,
                portfolio_item_id: None,
                payload: json!({ "fields": changed }),
            })
            .await
            .context("Failed to record profile activity")?;

        Ok(updated)
    }

    /// Send a draft profile for review
    pub async fn submit(&self, user: &User) -> Result<Artist, ArtistServiceError> {
        self.owner_transition(user, ArtistStatus::Pending).await
    }

    /// Pull a pending profile back to draft
    pub async fn withdraw(&self, user: &User) -> Result<Artist, ArtistServiceError> {
        self.owner_transition(user, ArtistStatus::Draft).await
    }

    async fn owner_transition(&self, user: &User, to: ArtistStatus) -> Result<Artist, ArtistServiceError> {
        let artist = self.require_own(user).await?;
        check_transition(artist.status, to, Actor::Owner)?;
        self.artist_repo
            .set_status(artist.id, to)
            .await
            .context("Failed to change artist status")?;
        tracing::info!("Artist {} moved from {} to {} by owner", artist.id, artist.status, to);
        self.artist_repo
            .get_by_id(artist.id)
            .await?
            .ok_or_else(|| ArtistServiceError::NotFound("Artist not found".to_string()))
    }

    pub async fn get_own(&self, user: &User) -> Result<Option<Artist>, ArtistServiceError> {
        Ok(self
            .artist_repo
            .get_by_user_id(user.id)
            .await
            .context("Failed to load artist profile")?)
    }

    /// The caller's profile, or `Forbidden` if they have none
    pub async fn require_own(&self, user: &User) -> Result<Artist, ArtistServiceError> {
        self.get_own(user)
            .await?
            .ok_or_else(|| ArtistServiceError::Forbidden("Create an artist profile first".to_string()))
    }

    /// Profile page lookup
    ///
    /// Non-approved profiles are visible only to their owner and to admins.
    pub async fn get_visible(&self, slug: &str, viewer: Option<&User>) -> Result<Artist, ArtistServiceError> {
        let artist = self
            .artist_repo
            .get_by_slug(slug)
            .await
            .context("Failed to load artist")?
            .ok_or_else(|| ArtistServiceError::NotFound(format!("Artist '{}' not found", slug)))?;

        if can_view(&artist, viewer) {
            Ok(artist)
        } else {
            Err(ArtistServiceError::NotFound(format!("Artist '{}' not found", slug)))
        }
    }

    /// Public directory: approved profiles only, whatever status the filter asks for
    pub async fn directory(
        &self,
        filter: ArtistFilter,
        params: &ListParams,
    ) -> Result<PagedResult<Artist>, ArtistServiceError> {
        let filter = ArtistFilter {
            status: Some(ArtistStatus::Approved),
            ..filter
        };
        let (items, total) = self
            .artist_repo
            .list(&filter, params)
            .await
            .context("Failed to list artists")?;
        Ok(PagedResult::new(items, total, params))
    }

    /// `base`, then `base-2`, `base-3`, ... until one is free
    async fn unique_slug(&self, name: &str) -> Result<String, ArtistServiceError> {
        let base = slugify(name);
        let mut candidate = base.clone();
        let mut n = 2;
        while self
            .artist_repo
            .slug_exists(&candidate)
            .await
            .context("Failed to check slug")?
        {
            candidate = format!("{}-{}", base, n);
            n += 1;
        }
        Ok(candidate)
    }
}

/// Whether `viewer` may see `artist`'s profile
pub fn can_view(artist: &Artist, viewer: Option<&User>) -> bool {
    artist.is_approved() || viewer.is_some_and(|u| u.is_admin() || u.id == artist.user_id)
}

fn check_links(errors: &mut FieldErrors, avatar_url: Option<&str>, website: Option<&str>, contact_email: Option<&str>) {
    if let Some(url) = avatar_url.filter(|v| !v.trim().is_empty()) {
        errors.url("avatar_url", url);
    }
    if let Some(url) = website.filter(|v| !v.trim().is_empty()) {
        errors.url("website", url);
    }
    if let Some(email) = contact_email.filter(|v| !v.trim().is_empty()) {
        errors.email("contact_email", email);
    }
}

/// Trimmed value, with blank strings treated as absent
fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
