//! Social graph service
//!
//! Follows between artists and likes on portfolio items. Both are
//! idempotent: repeating an action leaves the state unchanged and reports it.
//! Counters on artists and items are kept in step with the edges, and new
//! edges notify the artist on the receiving end.

use anyhow::Context;
use serde_json::json;
use std::sync::Arc;

use crate::db::repositories::{ArtistRepository, FollowRepository, LikeRepository, PortfolioRepository};
use crate::models::{
    Artist, ArtistStatus, ArtistSummary, FollowState, LikeState, ListParams, NewNotification, NotificationKind,
    PagedResult, PortfolioItem,
};
use crate::services::notification::NotificationService;
use crate::services::rate_limiter::RateLimiters;
use crate::services::settings::SettingsServiceError;

#[derive(Debug, thiserror::Error)]
pub enum SocialServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl From<SettingsServiceError> for SocialServiceError {
    fn from(err: SettingsServiceError) -> Self {
        match err {
            SettingsServiceError::InternalError(e) => SocialServiceError::InternalError(e),
            SettingsServiceError::ValidationError(fields) => {
                SocialServiceError::InternalError(anyhow::anyhow!("Invalid settings: {}", fields))
            }
        }
    }
}

pub struct SocialService {
    artist_repo: Arc<dyn ArtistRepository>,
    follow_repo: Arc<dyn FollowRepository>,
    like_repo: Arc<dyn LikeRepository>,
    portfolio_repo: Arc<dyn PortfolioRepository>,
    notifications: Arc<NotificationService>,
    limiters: Arc<RateLimiters>,
}

impl SocialService {
    pub fn new(
        artist_repo: Arc<dyn ArtistRepository>,
        follow_repo: Arc<dyn FollowRepository>,
        like_repo: Arc<dyn LikeRepository>,
        portfolio_repo: Arc<dyn PortfolioRepository>,
        notifications: Arc<NotificationService>,
        limiters: Arc<RateLimiters>,
    ) -> Self {
        Self {
            artist_repo,
            follow_repo,
            like_repo,
            portfolio_repo,
            notifications,
            limiters,
        }
    }

    pub async fn follow(&self, requester: &Artist, target_id: i64) -> Result<FollowState, SocialServiceError> {
        if requester.id == target_id {
            return Err(SocialServiceError::BadRequest("You cannot follow yourself".to_string()));
        }
        self.guard_action(requester).await?;
        require_public(requester, "follow other artists")?;
        let target = self.approved_artist(target_id).await?;

        let created = self
            .follow_repo
            .insert(requester.id, target.id)
            .await
            .context("Failed to insert follow")?;
        if created {
            self.artist_repo
                .adjust_follow_counts(requester.id, target.id, 1)
                .await
                .context("Failed to update follow counters")?;
            self.notifications
                .notify(NewNotification {
                    recipient_id: target.id,
                    actor_id: Some(requester.id),
                    kind: NotificationKind::Follow,
                    payload: json!({}),
                })
                .await?;
            tracing::info!("Artist {} followed {}", requester.id, target.id);
        }

        self.follow_state(requester, target.id).await
    }

    /// Remove the edge if present; any existing target may be unfollowed
    pub async fn unfollow(&self, requester: &Artist, target_id: i64) -> Result<FollowState, SocialServiceError> {
        self.guard_action(requester).await?;
        self.existing_artist(target_id).await?;

        let removed = self
            .follow_repo
            .delete(requester.id, target_id)
            .await
            .context("Failed to delete follow")?;
        if removed {
            self.artist_repo
                .adjust_follow_counts(requester.id, target_id, -1)
                .await
                .context("Failed to update follow counters")?;
            tracing::info!("Artist {} unfollowed {}", requester.id, target_id);
        }

        self.follow_state(requester, target_id).await
    }

    pub async fn follow_state(&self, requester: &Artist, target_id: i64) -> Result<FollowState, SocialServiceError> {
        let target = self.existing_artist(target_id).await?;
        let following = self
            .follow_repo
            .exists(requester.id, target.id)
            .await
            .context("Failed to check follow")?;
        Ok(FollowState {
            following,
            follower_count: target.follower_count,
        })
    }

    pub async fn like(&self, requester: &Artist, item_id: i64) -> Result<LikeState, SocialServiceError> {
        self.guard_action(requester).await?;
        require_public(requester, "like work")?;
        let item = self.existing_item(item_id).await?;
        self.approved_artist(item.artist_id).await?;

        let already = self
            .like_repo
            .exists(requester.id, item.id)
            .await
            .context("Failed to check like")?;
        if !already
            && self
                .like_repo
                .insert(requester.id, item.id)
                .await
                .context("Failed to insert like")?
        {
            self.portfolio_repo
                .adjust_like_count(item.id, 1)
                .await
                .context("Failed to update like counter")?;
            if item.artist_id != requester.id {
                self.notifications
                    .notify(NewNotification {
                        recipient_id: item.artist_id,
                        actor_id: Some(requester.id),
                        kind: NotificationKind::Like,
                        payload: json!({ "item_id": item.id, "title": item.title }),
                    })
                    .await?;
            }
        }

        self.like_state(requester, item.id).await
    }

    pub async fn unlike(&self, requester: &Artist, item_id: i64) -> Result<LikeState, SocialServiceError> {
        self.guard_action(requester).await?;
        let item = self.existing_item(item_id).await?;

        let removed = self
            .like_repo
            .delete(requester.id, item.id)
            .await
            .context("Failed to delete like")?;
        if removed {
            self.portfolio_repo
                .adjust_like_count(item.id, -1)
                .await
                .context("Failed to update like counter")?;
        }

        self.like_state(requester, item.id).await
    }

    pub async fn like_state(&self, requester: &Artist, item_id: i64) -> Result<LikeState, SocialServiceError> {
        let item = self.existing_item(item_id).await?;
        let liked = self
            .like_repo
            .exists(requester.id, item.id)
            .await
            .context("Failed to check like")?;
        Ok(LikeState {
            liked,
            like_count: item.like_count,
        })
    }

    /// Artists following `artist_id`, newest edge first
    pub async fn followers(
        &self,
        artist_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<ArtistSummary>, SocialServiceError> {
        let (ids, total) = self
            .follow_repo
            .list_followers(artist_id, params)
            .await
            .context("Failed to list followers")?;
        Ok(PagedResult::new(self.summaries_in_order(&ids).await?, total, params))
    }

    /// Artists `artist_id` follows, newest edge first
    pub async fn following(
        &self,
        artist_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<ArtistSummary>, SocialServiceError> {
        let (ids, total) = self
            .follow_repo
            .list_following(artist_id, params)
            .await
            .context("Failed to list following")?;
        Ok(PagedResult::new(self.summaries_in_order(&ids).await?, total, params))
    }

    /// Suspended artists are locked out; everyone else is rate limited.
    /// Unfollow and unlike stay open to draft and pending profiles.
    async fn guard_action(&self, requester: &Artist) -> Result<(), SocialServiceError> {
        if requester.status == ArtistStatus::Suspended {
            return Err(SocialServiceError::Forbidden(
                "Suspended artists cannot follow or like".to_string(),
            ));
        }
        if !self.limiters.social.try_acquire(&requester.id.to_string()).await {
            tracing::warn!("Social rate limit hit for artist {}", requester.id);
            return Err(SocialServiceError::RateLimited);
        }
        Ok(())
    }

    async fn existing_artist(&self, id: i64) -> Result<Artist, SocialServiceError> {
        self.artist_repo
            .get_by_id(id)
            .await
            .context("Failed to load artist")?
            .ok_or_else(|| SocialServiceError::NotFound(format!("Artist {} not found", id)))
    }

    async fn approved_artist(&self, id: i64) -> Result<Artist, SocialServiceError> {
        Some(self.existing_artist(id).await?)
            .filter(Artist::is_approved)
            .ok_or_else(|| SocialServiceError::NotFound(format!("Artist {} not found", id)))
    }

    async fn existing_item(&self, id: i64) -> Result<PortfolioItem, SocialServiceError> {
        self.portfolio_repo
            .get_by_id(id)
            .await
            .context("Failed to load portfolio item")?
            .ok_or_else(|| SocialServiceError::NotFound(format!("Portfolio item {} not found", id)))
    }

    async fn summaries_in_order(&self, ids: &[i64]) -> Result<Vec<ArtistSummary>, SocialServiceError> {
        let artists = self.artist_repo.get_many(ids).await.context("Failed to load artists")?;
        Ok(ids
            .iter()
            .filter_map(|id| artists.iter().find(|a| a.id == *id).map(Artist::summary))
            .collect())
    }
}

/// Follows and likes name the requester as actor in the other artist's
/// notifications, so only approved profiles may create them
fn require_public(requester: &Artist, action: &str) -> Result<(), SocialServiceError> {
    if requester.is_approved() {
        Ok(())
    } else {
        Err(SocialServiceError::Forbidden(format!(
            "Your profile must be approved before you can {}",
            action
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::db::repositories::test_support::{migrated_pool, seed_artist};
    use crate::db::repositories::{
        NotificationRepository, SqlxArtistRepository, SqlxFollowRepository, SqlxLikeRepository,
        SqlxNotificationRepository, SqlxPortfolioRepository,
    };
    use crate::db::DynDatabasePool;
    use crate::models::{Location, Medium, PortfolioItemInput};

    struct Fixture {
        pool: DynDatabasePool,
        social: SocialService,
        notifications: Arc<dyn NotificationRepository>,
    }

    async fn fixture_with(limits: RateLimitConfig) -> Fixture {
        let pool = migrated_pool().await;
        let artist_repo = SqlxArtistRepository::boxed(pool.clone());
        let notifications = SqlxNotificationRepository::boxed(pool.clone());
        let social = SocialService::new(
            artist_repo.clone(),
            SqlxFollowRepository::boxed(pool.clone()),
            SqlxLikeRepository::boxed(pool.clone()),
            SqlxPortfolioRepository::boxed(pool.clone()),
            Arc::new(NotificationService::new(notifications.clone(), artist_repo)),
            Arc::new(RateLimiters::from_config(&limits)),
        );
        Fixture {
            pool,
            social,
            notifications,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(RateLimitConfig::default()).await
    }

    async fn artist(pool: &DynDatabasePool, slug: &str, status: ArtistStatus) -> Artist {
        seed_artist(pool, slug, Medium::Painting, Location::GeorgeTown, status).await
    }

    async fn item(pool: &DynDatabasePool, artist_id: i64) -> PortfolioItem {
        SqlxPortfolioRepository::new(pool.clone())
            .create(
                artist_id,
                &PortfolioItemInput {
                    title: "Boy on a Motorbike".to_string(),
                    description: String::new(),
                    image_url: "/uploads/motorbike.jpg".to_string(),
                    medium: Medium::StreetArt,
                    year: Some(2012),
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_follow_is_idempotent_and_counts() {
        let f = fixture().await;
        let alice = artist(&f.pool, "alice", ArtistStatus::Approved).await;
        let bob = artist(&f.pool, "bob", ArtistStatus::Approved).await;

        let state = f.social.follow(&alice, bob.id).await.unwrap();
        assert_eq!(state, FollowState { following: true, follower_count: 1 });
        let again = f.social.follow(&alice, bob.id).await.unwrap();
        assert_eq!(again, state);

        let inbox = f.notifications.list(bob.id, false, &ListParams::default()).await.unwrap();
        assert_eq!(inbox.1, 1);

        let followers = f.social.followers(bob.id, &ListParams::default()).await.unwrap();
        assert_eq!(followers.items[0].slug, "alice");
        let following = f.social.following(alice.id, &ListParams::default()).await.unwrap();
        assert_eq!(following.total, 1);

        let state = f.social.unfollow(&alice, bob.id).await.unwrap();
        assert_eq!(state, FollowState { following: false, follower_count: 0 });
        let again = f.social.unfollow(&alice, bob.id).await.unwrap();
        assert_eq!(again.follower_count, 0);
    }

    #[tokio::test]
    async fn test_follow_rejections() {
        let f = fixture().await;
        let alice = artist(&f.pool, "alice", ArtistStatus::Approved).await;
        let pending = artist(&f.pool, "pending", ArtistStatus::Pending).await;
        let suspended = artist(&f.pool, "suspended", ArtistStatus::Suspended).await;

        assert!(matches!(
            f.social.follow(&alice, alice.id).await,
            Err(SocialServiceError::BadRequest(_))
        ));
        assert!(matches!(
            f.social.follow(&alice, pending.id).await,
            Err(SocialServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.social.follow(&alice, 9999).await,
            Err(SocialServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.social.follow(&suspended, alice.id).await,
            Err(SocialServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_unpublished_profiles_cannot_follow_or_like() {
        let f = fixture().await;
        let alice = artist(&f.pool, "alice", ArtistStatus::Approved).await;
        let work = item(&f.pool, alice.id).await;

        for status in [ArtistStatus::Draft, ArtistStatus::Pending] {
            let requester = artist(&f.pool, status.as_str(), status).await;
            assert!(matches!(
                f.social.follow(&requester, alice.id).await,
                Err(SocialServiceError::Forbidden(_))
            ));
            assert!(matches!(
                f.social.like(&requester, work.id).await,
                Err(SocialServiceError::Forbidden(_))
            ));
            // Unfollow and unlike stay available
            assert!(!f.social.unfollow(&requester, alice.id).await.unwrap().following);
            assert!(!f.social.unlike(&requester, work.id).await.unwrap().liked);
        }

        let inbox = f.notifications.list(alice.id, false, &ListParams::default()).await.unwrap();
        assert_eq!(inbox.1, 0);
        assert_eq!(f.social.follow_state(&alice, alice.id).await.unwrap().follower_count, 0);
    }

    #[tokio::test]
    async fn test_social_actions_rate_limited() {
        let f = fixture_with(RateLimitConfig {
            social_per_minute: 2,
            ..RateLimitConfig::default()
        })
        .await;
        let alice = artist(&f.pool, "alice", ArtistStatus::Approved).await;
        let bob = artist(&f.pool, "bob", ArtistStatus::Approved).await;

        f.social.follow(&alice, bob.id).await.unwrap();
        f.social.unfollow(&alice, bob.id).await.unwrap();
        assert!(matches!(
            f.social.follow(&alice, bob.id).await,
            Err(SocialServiceError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn test_like_unlike_and_owner_not_notified() {
        let f = fixture().await;
        let alice = artist(&f.pool, "alice", ArtistStatus::Approved).await;
        let bob = artist(&f.pool, "bob", ArtistStatus::Approved).await;
        let work = item(&f.pool, bob.id).await;

        let state = f.social.like(&alice, work.id).await.unwrap();
        assert_eq!(state, LikeState { liked: true, like_count: 1 });
        assert_eq!(f.social.like(&alice, work.id).await.unwrap().like_count, 1);

        f.social.like(&bob, work.id).await.unwrap();
        let inbox = f.notifications.list(bob.id, false, &ListParams::default()).await.unwrap();
        assert_eq!(inbox.1, 1);

        let state = f.social.unlike(&alice, work.id).await.unwrap();
        assert_eq!(state, LikeState { liked: false, like_count: 1 });
        assert_eq!(f.social.unlike(&alice, work.id).await.unwrap().like_count, 1);
    }

    #[tokio::test]
    async fn test_cannot_like_work_of_unapproved_artist() {
        let f = fixture().await;
        let alice = artist(&f.pool, "alice", ArtistStatus::Approved).await;
        let draft = artist(&f.pool, "draft", ArtistStatus::Draft).await;
        let work = item(&f.pool, draft.id).await;

        assert!(matches!(
            f.social.like(&alice, work.id).await,
            Err(SocialServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.social.like(&alice, 4242).await,
            Err(SocialServiceError::NotFound(_))
        ));
    }
}
