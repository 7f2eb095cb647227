//! Platform settings service
//!
//! Typed access to the key/value settings table. The public subset is
//! cached; admin updates invalidate it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::cache::{CacheLayer, SharedCache};
use crate::db::repositories::SettingsRepository;
use crate::services::validation::FieldErrors;

/// Known setting keys
pub mod keys {
    pub const SITE_NAME: &str = "site_name";
    pub const SITE_DESCRIPTION: &str = "site_description";
    pub const REGISTRATION_OPEN: &str = "registration_open";
    pub const AUTO_SUBMIT_PROFILES: &str = "auto_submit_profiles";
    pub const FEED_PAGE_SIZE: &str = "feed_page_size";

    pub const ALL: [&str; 5] = [
        SITE_NAME,
        SITE_DESCRIPTION,
        REGISTRATION_OPEN,
        AUTO_SUBMIT_PROFILES,
        FEED_PAGE_SIZE,
    ];
}

const PUBLIC_CACHE_KEY: &str = "settings:public";
const PUBLIC_CACHE_TTL: Duration = Duration::from_secs(600);

/// Upper bound for the feed page size setting and the `limit` query
pub const MAX_FEED_PAGE_SIZE: i64 = 50;

/// Settings visible to anonymous visitors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicSettings {
    pub site_name: String,
    pub site_description: String,
    pub registration_open: bool,
}

/// Every known setting, as the admin console sees them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSettings {
    pub site_name: String,
    pub site_description: String,
    pub registration_open: bool,
    pub auto_submit_profiles: bool,
    pub feed_page_size: i64,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            site_name: "Penang Artists".to_string(),
            site_description: "Discover the artists of Penang".to_string(),
            registration_open: true,
            auto_submit_profiles: false,
            feed_page_size: 20,
        }
    }
}

impl PlatformSettings {
    fn from_map(map: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        Self {
            site_name: map.get(keys::SITE_NAME).cloned().unwrap_or(defaults.site_name),
            site_description: map
                .get(keys::SITE_DESCRIPTION)
                .cloned()
                .unwrap_or(defaults.site_description),
            registration_open: map
                .get(keys::REGISTRATION_OPEN)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.registration_open),
            auto_submit_profiles: map
                .get(keys::AUTO_SUBMIT_PROFILES)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.auto_submit_profiles),
            feed_page_size: map
                .get(keys::FEED_PAGE_SIZE)
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.feed_page_size)
                .clamp(1, MAX_FEED_PAGE_SIZE),
        }
    }

    pub fn public(&self) -> PublicSettings {
        PublicSettings {
            site_name: self.site_name.clone(),
            site_description: self.site_description.clone(),
            registration_open: self.registration_open,
        }
    }
}

/// Partial admin update; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSettingsInput {
    pub site_name: Option<String>,
    pub site_description: Option<String>,
    pub registration_open: Option<bool>,
    pub auto_submit_profiles: Option<bool>,
    pub feed_page_size: Option<i64>,
}

#[derive(Debug, Error)]
pub enum SettingsServiceError {
    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
    cache: SharedCache,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepository>, cache: SharedCache) -> Self {
        Self { repo, cache }
    }

    pub async fn get_all(&self) -> Result<PlatformSettings, SettingsServiceError> {
        let map = self.repo.get_many(&keys::ALL).await?;
        Ok(PlatformSettings::from_map(&map))
    }

    pub async fn get_public(&self) -> Result<PublicSettings, SettingsServiceError> {
        if let Ok(Some(cached)) = self.cache.get::<PublicSettings>(PUBLIC_CACHE_KEY).await {
            return Ok(cached);
        }
        let public = self.get_all().await?.public();
        if let Err(e) = self.cache.set(PUBLIC_CACHE_KEY, &public, PUBLIC_CACHE_TTL).await {
            tracing::warn!("Failed to cache public settings: {}", e);
        }
        Ok(public)
    }

    pub async fn update(&self, input: UpdateSettingsInput) -> Result<PlatformSettings, SettingsServiceError> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &input.site_name {
            errors.require_text(keys::SITE_NAME, name, 100);
        }
        if let Some(description) = &input.site_description {
            errors.max_len(keys::SITE_DESCRIPTION, description, 500);
        }
        if let Some(size) = input.feed_page_size {
            if !(1..=MAX_FEED_PAGE_SIZE).contains(&size) {
                errors.add(
                    keys::FEED_PAGE_SIZE,
                    format!("must be between 1 and {}", MAX_FEED_PAGE_SIZE),
                );
            }
        }
        errors.into_result().map_err(SettingsServiceError::ValidationError)?;

        let mut map = HashMap::new();
        if let Some(name) = input.site_name {
            map.insert(keys::SITE_NAME.to_string(), name.trim().to_string());
        }
        if let Some(description) = input.site_description {
            map.insert(keys::SITE_DESCRIPTION.to_string(), description.trim().to_string());
        }
        if let Some(open) = input.registration_open {
            map.insert(keys::REGISTRATION_OPEN.to_string(), open.to_string());
        }
        if let Some(auto) = input.auto_submit_profiles {
            map.insert(keys::AUTO_SUBMIT_PROFILES.to_string(), auto.to_string());
        }
        if let Some(size) = input.feed_page_size {
            map.insert(keys::FEED_PAGE_SIZE.to_string(), size.to_string());
        }
        self.repo.set_many(&map).await?;

        if let Err(e) = self.cache.delete(PUBLIC_CACHE_KEY).await {
            tracing::warn!("Failed to invalidate settings cache: {}", e);
        }
        tracing::info!("Updated platform settings: {:?}", map.keys().collect::<Vec<_>>());
        self.get_all().await
    }

    pub async fn registration_open(&self) -> Result<bool, SettingsServiceError> {
        Ok(self.get_public().await?.registration_open)
    }

    pub async fn auto_submit_profiles(&self) -> Result<bool, SettingsServiceError> {
        Ok(self.get_all().await?.auto_submit_profiles)
    }

    pub async fn feed_page_size(&self) -> Result<i64, SettingsServiceError> {
        Ok(self.get_all().await?.feed_page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::test_support::migrated_pool;
    use crate::db::repositories::SqlxSettingsRepository;

    async fn service() -> SettingsService {
        let pool = migrated_pool().await;
        SettingsService::new(SqlxSettingsRepository::boxed(pool), Arc::new(MemoryCache::new()))
    }

    #[tokio::test]
    async fn test_defaults_from_seeded_rows() {
        let service = service().await;
        assert_eq!(service.get_all().await.unwrap(), PlatformSettings::default());
        assert!(service.registration_open().await.unwrap());
        assert_eq!(service.feed_page_size().await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_update_invalidates_public_cache() {
        let service = service().await;
        assert_eq!(service.get_public().await.unwrap().site_name, "Penang Artists");

        let updated = service
            .update(UpdateSettingsInput {
                site_name: Some("  Art of Penang ".to_string()),
                registration_open: Some(false),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.site_name, "Art of Penang");
        assert_eq!(updated.site_description, "Discover the artists of Penang");

        let public = service.get_public().await.unwrap();
        assert_eq!(public.site_name, "Art of Penang");
        assert!(!public.registration_open);
    }

    #[tokio::test]
    async fn test_update_rejects_bad_values() {
        let service = service().await;
        let err = service
            .update(UpdateSettingsInput {
                site_name: Some(" ".to_string()),
                feed_page_size: Some(500),
                ..Default::default()
            })
            .await
            .unwrap_err();
        match err {
            SettingsServiceError::ValidationError(fields) => {
                assert!(fields.get("site_name").is_some());
                assert!(fields.get("feed_page_size").is_some());
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(service.feed_page_size().await.unwrap(), 20);
    }

    #[test]
    fn test_from_map_clamps_and_falls_back() {
        let mut map = HashMap::new();
        map.insert(keys::FEED_PAGE_SIZE.to_string(), "999".to_string());
        map.insert(keys::REGISTRATION_OPEN.to_string(), "garbage".to_string());
        let settings = PlatformSettings::from_map(&map);
        assert_eq!(settings.feed_page_size, MAX_FEED_PAGE_SIZE);
        assert!(settings.registration_open);
    }
}
