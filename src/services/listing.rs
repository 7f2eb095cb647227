//! Service listing service
//!
//! Commissions, workshops and tours an artist offers. Inactive listings are
//! only visible to their owner.

use anyhow::Context;
use serde_json::json;
use std::sync::Arc;

use crate::db::repositories::{ActivityRepository, ArtistRepository, ListingRepository};
use crate::models::{ActivityKind, Artist, NewActivity, ServiceListing, ServiceListingInput, User};
use crate::services::content::{ensure_owner, ensure_visible, ContentServiceError};
use crate::services::validation::FieldErrors;

pub struct ListingService {
    listing_repo: Arc<dyn ListingRepository>,
    artist_repo: Arc<dyn ArtistRepository>,
    activity_repo: Arc<dyn ActivityRepository>,
}

impl ListingService {
    pub fn new(
        listing_repo: Arc<dyn ListingRepository>,
        artist_repo: Arc<dyn ArtistRepository>,
        activity_repo: Arc<dyn ActivityRepository>,
    ) -> Self {
        Self {
            listing_repo,
            artist_repo,
            activity_repo,
        }
    }

    pub async fn create(&self, owner: &Artist, input: ServiceListingInput) -> Result<ServiceListing, ContentServiceError> {
        validate(&input)?;
        let listing = self
            .listing_repo
            .create(owner.id, &input)
            .await
            .context("Failed to create service listing")?;

        self.activity_repo
            .create(&NewActivity {
                artist_id: owner.id,
                kind: ActivityKind::ServiceCreated,
                portfolio_item_id: None,
                payload: json!({
                    "service_id": listing.id,
                    "title": listing.title,
                    "price_cents": listing.price_cents,
                    "price_unit": listing.price_unit,
                }),
            })
            .await
            .context("Failed to record service activity")?;

        Ok(listing)
    }

    pub async fn update(
        &self,
        owner: &Artist,
        id: i64,
        input: ServiceListingInput,
    ) -> Result<ServiceListing, ContentServiceError> {
        let listing = self.load(id).await?;
        ensure_owner(owner, listing.artist_id, "services")?;
        validate(&input)?;
        self.listing_repo
            .update(id, &input)
            .await
            .context("Failed to update service listing")?
            .ok_or_else(|| not_found(id))
    }

    pub async fn delete(&self, owner: &Artist, id: i64) -> Result<(), ContentServiceError> {
        let listing = self.load(id).await?;
        ensure_owner(owner, listing.artist_id, "services")?;
        self.listing_repo
            .delete(id)
            .await
            .context("Failed to delete service listing")?;
        Ok(())
    }

    pub async fn get(&self, id: i64, viewer: Option<&User>) -> Result<ServiceListing, ContentServiceError> {
        let listing = self.load(id).await?;
        let artist = self
            .artist_repo
            .get_by_id(listing.artist_id)
            .await
            .context("Failed to load artist")?;
        ensure_visible(artist.as_ref(), viewer, || format!("Service {} not found", id))?;
        if !listing.is_active && !is_owner(artist.as_ref(), viewer) {
            return Err(not_found(id));
        }
        Ok(listing)
    }

    /// Listings of `artist`; visitors other than the owner see active ones only
    pub async fn list_for_artist(
        &self,
        artist: &Artist,
        viewer: Option<&User>,
    ) -> Result<Vec<ServiceListing>, ContentServiceError> {
        let active_only = !is_owner(Some(artist), viewer);
        Ok(self
            .listing_repo
            .list_by_artist(artist.id, active_only)
            .await
            .context("Failed to list service listings")?)
    }

    async fn load(&self, id: i64) -> Result<ServiceListing, ContentServiceError> {
        self.listing_repo
            .get_by_id(id)
            .await
            .context("Failed to load service listing")?
            .ok_or_else(|| not_found(id))
    }
}

fn is_owner(artist: Option<&Artist>, viewer: Option<&User>) -> bool {
    matches!((artist, viewer), (Some(a), Some(u)) if a.user_id == u.id)
}

fn not_found(id: i64) -> ContentServiceError {
    ContentServiceError::NotFound(format!("Service {} not found", id))
}

fn validate(input: &ServiceListingInput) -> Result<(), ContentServiceError> {
    let mut errors = FieldErrors::new();
    errors.require_text("title", &input.title, 200);
    errors.max_len("description", &input.description, 2000);
    errors.non_negative("price_cents", input.price_cents);
    errors.into_result().map_err(ContentServiceError::ValidationError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{migrated_pool, seed_artist};
    use crate::db::repositories::{SqlxActivityRepository, SqlxArtistRepository, SqlxListingRepository, SqlxUserRepository, UserRepository};
    use crate::models::{ArtistStatus, Location, Medium, PriceUnit};

    fn input(title: &str, is_active: bool) -> ServiceListingInput {
        ServiceListingInput {
            title: title.to_string(),
            description: "Batik workshop for beginners".to_string(),
            price_cents: Some(12000),
            price_unit: PriceUnit::Fixed,
            is_active,
        }
    }

    #[tokio::test]
    async fn test_inactive_listings_hidden_from_visitors() {
        let pool = migrated_pool().await;
        let owner = seed_artist(&pool, "owner", Medium::Textile, Location::AirItam, ArtistStatus::Approved).await;
        let owner_user = SqlxUserRepository::new(pool.clone())
            .get_by_id(owner.user_id)
            .await
            .unwrap()
            .unwrap();
        let service = ListingService::new(
            SqlxListingRepository::boxed(pool.clone()),
            SqlxArtistRepository::boxed(pool.clone()),
            SqlxActivityRepository::boxed(pool.clone()),
        );

        let active = service.create(&owner, input("Workshop", true)).await.unwrap();
        let paused = service.create(&owner, input("Commission", false)).await.unwrap();

        assert_eq!(service.list_for_artist(&owner, None).await.unwrap().len(), 1);
        assert_eq!(service.list_for_artist(&owner, Some(&owner_user)).await.unwrap().len(), 2);

        assert!(service.get(active.id, None).await.is_ok());
        assert!(matches!(
            service.get(paused.id, None).await,
            Err(ContentServiceError::NotFound(_))
        ));
        assert!(service.get(paused.id, Some(&owner_user)).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_requires_owner_and_valid_price() {
        let pool = migrated_pool().await;
        let owner = seed_artist(&pool, "owner", Medium::Textile, Location::AirItam, ArtistStatus::Approved).await;
        let other = seed_artist(&pool, "other", Medium::Textile, Location::AirItam, ArtistStatus::Approved).await;
        let service = ListingService::new(
            SqlxListingRepository::boxed(pool.clone()),
            SqlxArtistRepository::boxed(pool.clone()),
            SqlxActivityRepository::boxed(pool.clone()),
        );
        let listing = service.create(&owner, input("Workshop", true)).await.unwrap();

        assert!(matches!(
            service.update(&other, listing.id, input("Mine", true)).await,
            Err(ContentServiceError::Forbidden(_))
        ));
        let mut bad = input("Workshop", true);
        bad.price_cents = Some(-1);
        assert!(matches!(
            service.update(&owner, listing.id, bad).await,
            Err(ContentServiceError::ValidationError(_))
        ));
        service.delete(&owner, listing.id).await.unwrap();
        assert!(service.get(listing.id, None).await.is_err());
    }
}
