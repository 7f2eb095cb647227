//! Inquiry service
//!
//! Visitors (signed in or not) contact an artist about one of their active
//! service listings. Submissions are rate limited per client address.

use anyhow::Context;
use serde_json::json;
use std::sync::Arc;

use crate::db::repositories::{ArtistRepository, InquiryRepository, ListingRepository};
use crate::models::{
    Artist, Inquiry, InquiryInput, InquiryStatus, ListParams, NewNotification, NotificationKind, PagedResult,
};
use crate::services::content::ContentServiceError;
use crate::services::notification::NotificationService;
use crate::services::rate_limiter::RateLimiters;
use crate::services::validation::FieldErrors;

pub struct InquiryService {
    inquiry_repo: Arc<dyn InquiryRepository>,
    listing_repo: Arc<dyn ListingRepository>,
    artist_repo: Arc<dyn ArtistRepository>,
    notifications: Arc<NotificationService>,
    limiters: Arc<RateLimiters>,
}

impl InquiryService {
    pub fn new(
        inquiry_repo: Arc<dyn InquiryRepository>,
        listing_repo: Arc<dyn ListingRepository>,
        artist_repo: Arc<dyn ArtistRepository>,
        notifications: Arc<NotificationService>,
        limiters: Arc<RateLimiters>,
    ) -> Self {
        Self {
            inquiry_repo,
            listing_repo,
            artist_repo,
            notifications,
            limiters,
        }
    }

    /// Send an inquiry about service `service_id` from `client` (an IP address)
    pub async fn submit(
        &self,
        service_id: i64,
        input: InquiryInput,
        client: &str,
    ) -> Result<Inquiry, ContentServiceError> {
        let not_found = || ContentServiceError::NotFound(format!("Service {} not found", service_id));
        let listing = self
            .listing_repo
            .get_by_id(service_id)
            .await
            .context("Failed to load service listing")?
            .filter(|l| l.is_active)
            .ok_or_else(not_found)?;
        let artist = self
            .artist_repo
            .get_by_id(listing.artist_id)
            .await
            .context("Failed to load artist")?
            .filter(Artist::is_approved)
            .ok_or_else(not_found)?;

        let mut errors = FieldErrors::new();
        errors.require_text("name", &input.name, 100);
        errors.email("email", &input.email);
        errors.require_text("message", &input.message, 5000);
        errors.into_result().map_err(ContentServiceError::ValidationError)?;

        if !self.limiters.inquiry.try_acquire(client).await {
            tracing::warn!("Inquiry rate limit hit for {}", client);
            return Err(ContentServiceError::RateLimited);
        }

        let input = InquiryInput {
            name: input.name.trim().to_string(),
            email: input.email.trim().to_string(),
            message: input.message.trim().to_string(),
        };
        let inquiry = self
            .inquiry_repo
            .create(listing.id, artist.id, &input)
            .await
            .context("Failed to create inquiry")?;

        self.notifications
            .notify(NewNotification {
                recipient_id: artist.id,
                actor_id: None,
                kind: NotificationKind::Inquiry,
                payload: json!({
                    "inquiry_id": inquiry.id,
                    "service_id": listing.id,
                    "service_title": listing.title,
                    "name": inquiry.name,
                }),
            })
            .await?;

        tracing::info!("Inquiry {} sent to artist {} about service {}", inquiry.id, artist.id, listing.id);
        Ok(inquiry)
    }

    pub async fn list_for_owner(
        &self,
        owner: &Artist,
        status: Option<InquiryStatus>,
        params: &ListParams,
    ) -> Result<PagedResult<Inquiry>, ContentServiceError> {
        let (items, total) = self
            .inquiry_repo
            .list_by_artist(owner.id, status, params)
            .await
            .context("Failed to list inquiries")?;
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn set_status(
        &self,
        owner: &Artist,
        id: i64,
        status: InquiryStatus,
    ) -> Result<Inquiry, ContentServiceError> {
        self.inquiry_repo
            .set_status(id, owner.id, status)
            .await
            .context("Failed to update inquiry")?
            .ok_or_else(|| ContentServiceError::NotFound(format!("Inquiry {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::db::repositories::test_support::{migrated_pool, seed_artist};
    use crate::db::repositories::{
        NotificationRepository, SqlxArtistRepository, SqlxInquiryRepository, SqlxListingRepository,
        SqlxNotificationRepository,
    };
    use crate::db::DynDatabasePool;
    use crate::models::{ArtistStatus, Location, Medium, PriceUnit, ServiceListingInput};

    struct Fixture {
        pool: DynDatabasePool,
        inquiries: InquiryService,
        notifications: Arc<dyn NotificationRepository>,
    }

    async fn fixture(limits: RateLimitConfig) -> Fixture {
        let pool = migrated_pool().await;
        let artist_repo = SqlxArtistRepository::boxed(pool.clone());
        let notifications = SqlxNotificationRepository::boxed(pool.clone());
        let inquiries = InquiryService::new(
            SqlxInquiryRepository::boxed(pool.clone()),
            SqlxListingRepository::boxed(pool.clone()),
            artist_repo.clone(),
            Arc::new(NotificationService::new(notifications.clone(), artist_repo)),
            Arc::new(RateLimiters::from_config(&limits)),
        );
        Fixture {
            pool,
            inquiries,
            notifications,
        }
    }

    async fn listing(pool: &DynDatabasePool, artist_id: i64, is_active: bool) -> i64 {
        SqlxListingRepository::new(pool.clone())
            .create(
                artist_id,
                &ServiceListingInput {
                    title: "Portrait commission".to_string(),
                    description: String::new(),
                    price_cents: None,
                    price_unit: PriceUnit::OnRequest,
                    is_active,
                },
            )
            .await
            .unwrap()
            .id
    }

    fn input() -> InquiryInput {
        InquiryInput {
            name: "Siti".to_string(),
            email: "siti@example.com".to_string(),
            message: "Could you paint our shophouse?".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_notifies_and_owner_manages() {
        let f = fixture(RateLimitConfig::default()).await;
        let artist = seed_artist(&f.pool, "painter", Medium::Painting, Location::GeorgeTown, ArtistStatus::Approved).await;
        let other = seed_artist(&f.pool, "other", Medium::Painting, Location::GeorgeTown, ArtistStatus::Approved).await;
        let service_id = listing(&f.pool, artist.id, true).await;

        let inquiry = f.inquiries.submit(service_id, input(), "10.0.0.1").await.unwrap();
        assert_eq!(inquiry.status, InquiryStatus::New);

        let (inbox, _) = f
            .notifications
            .list(artist.id, false, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(inbox[0].kind, NotificationKind::Inquiry);
        assert_eq!(inbox[0].payload["inquiry_id"], inquiry.id);

        let page = f.inquiries.list_for_owner(&artist, None, &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 1);

        assert!(matches!(
            f.inquiries.set_status(&other, inquiry.id, InquiryStatus::Read).await,
            Err(ContentServiceError::NotFound(_))
        ));
        let read = f.inquiries.set_status(&artist, inquiry.id, InquiryStatus::Read).await.unwrap();
        assert_eq!(read.status, InquiryStatus::Read);
    }

    #[tokio::test]
    async fn test_inactive_or_hidden_services_rejected() {
        let f = fixture(RateLimitConfig::default()).await;
        let approved = seed_artist(&f.pool, "a", Medium::Painting, Location::GeorgeTown, ArtistStatus::Approved).await;
        let pending = seed_artist(&f.pool, "p", Medium::Painting, Location::GeorgeTown, ArtistStatus::Pending).await;
        let inactive = listing(&f.pool, approved.id, false).await;
        let hidden = listing(&f.pool, pending.id, true).await;

        for id in [inactive, hidden, 31337] {
            assert!(matches!(
                f.inquiries.submit(id, input(), "10.0.0.1").await,
                Err(ContentServiceError::NotFound(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_rate_limited_per_client() {
        let f = fixture(RateLimitConfig {
            inquiries: 1,
            ..RateLimitConfig::default()
        })
        .await;
        let artist = seed_artist(&f.pool, "painter", Medium::Painting, Location::GeorgeTown, ArtistStatus::Approved).await;
        let service_id = listing(&f.pool, artist.id, true).await;

        f.inquiries.submit(service_id, input(), "10.0.0.1").await.unwrap();
        assert!(matches!(
            f.inquiries.submit(service_id, input(), "10.0.0.1").await,
            Err(ContentServiceError::RateLimited)
        ));
        assert!(f.inquiries.submit(service_id, input(), "10.0.0.2").await.is_ok());
    }
}
