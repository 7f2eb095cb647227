//! Moderation
//!
//! The artist status lifecycle and the admin console operations built on it.
//!
//! | from      | to        | who                       |
//! |-----------|-----------|---------------------------|
//! | draft     | pending   | owner                     |
//! | pending   | draft     | owner (withdraw) or admin |
//! | pending   | approved  | admin                     |
//! | approved  | suspended | admin                     |
//! | suspended | approved  | admin                     |

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::cache::SharedCache;
use crate::db::repositories::{ArtistRepository, PortfolioRepository};
use crate::models::{
    Artist, ArtistFilter, ArtistStatus, ListParams, NewNotification, NotificationKind, PagedResult,
};
use crate::services::artist::ArtistServiceError;
use crate::services::discovery::invalidate_trending;
use crate::services::notification::NotificationService;

/// Who is asking for a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Owner,
    Admin,
}

/// Whether `actor` may move a profile from `from` to `to`
pub fn is_allowed(from: ArtistStatus, to: ArtistStatus, actor: Actor) -> bool {
    use ArtistStatus::*;
    match (from, to) {
        (Draft, Pending) => actor == Actor::Owner,
        (Pending, Draft) => true,
        (Pending, Approved) | (Approved, Suspended) | (Suspended, Approved) => actor == Actor::Admin,
        _ => false,
    }
}

pub fn check_transition(from: ArtistStatus, to: ArtistStatus, actor: Actor) -> Result<(), ArtistServiceError> {
    if from == to {
        return Err(ArtistServiceError::BadRequest(format!("Artist is already {}", to)));
    }
    if !is_allowed(from, to, actor) {
        return Err(ArtistServiceError::BadRequest(format!(
            "invalid status transition: {} -> {}",
            from, to
        )));
    }
    Ok(())
}

/// Admin bulk action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Approve,
    Reject,
    Suspend,
    Reinstate,
    Feature,
    Unfeature,
}

impl BulkAction {
    /// Target status for the status-changing actions
    fn target_status(&self) -> Option<ArtistStatus> {
        match self {
            BulkAction::Approve | BulkAction::Reinstate => Some(ArtistStatus::Approved),
            BulkAction::Reject => Some(ArtistStatus::Draft),
            BulkAction::Suspend => Some(ArtistStatus::Suspended),
            BulkAction::Feature | BulkAction::Unfeature => None,
        }
    }

    /// Status the profile must currently have
    fn source_status(&self) -> Option<ArtistStatus> {
        match self {
            BulkAction::Approve | BulkAction::Reject => Some(ArtistStatus::Pending),
            BulkAction::Suspend => Some(ArtistStatus::Approved),
            BulkAction::Reinstate => Some(ArtistStatus::Suspended),
            BulkAction::Feature | BulkAction::Unfeature => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkRequest {
    pub action: BulkAction,
    pub ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkFailure {
    pub id: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkResult {
    pub succeeded: Vec<i64>,
    pub failed: Vec<BulkFailure>,
}

pub struct ModerationService {
    artist_repo: Arc<dyn ArtistRepository>,
    portfolio_repo: Arc<dyn PortfolioRepository>,
    notifications: Arc<NotificationService>,
    cache: SharedCache,
}

impl ModerationService {
    pub fn new(
        artist_repo: Arc<dyn ArtistRepository>,
        portfolio_repo: Arc<dyn PortfolioRepository>,
        notifications: Arc<NotificationService>,
        cache: SharedCache,
    ) -> Self {
        Self {
            artist_repo,
            portfolio_repo,
            notifications,
            cache,
        }
    }

    /// Every profile regardless of status unless the filter narrows it
    pub async fn list(&self, filter: &ArtistFilter, params: &ListParams) -> Result<PagedResult<Artist>, ArtistServiceError> {
        let (items, total) = self
            .artist_repo
            .list(filter, params)
            .await
            .context("Failed to list artists")?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Admin status change; the artist is notified of the decision
    pub async fn set_status(&self, id: i64, to: ArtistStatus) -> Result<Artist, ArtistServiceError> {
        let artist = self.load(id).await?;
        self.apply_status(artist, to).await
    }

    pub async fn set_featured(&self, id: i64, featured: bool) -> Result<Artist, ArtistServiceError> {
        let artist = self.load(id).await?;
        self.artist_repo
            .set_featured(artist.id, featured)
            .await
            .context("Failed to set featured flag")?;
        invalidate_trending(&self.cache).await;
        tracing::info!("Artist {} featured = {}", artist.id, featured);
        self.load(id).await
    }

    /// Apply `action` to each id independently
    pub async fn bulk(&self, request: &BulkRequest) -> BulkResult {
        let mut result = BulkResult::default();
        for &id in &request.ids {
            match self.bulk_one(request.action, id).await {
                Ok(()) => result.succeeded.push(id),
                Err(e) => {
                    let reason = match e {
                        ArtistServiceError::InternalError(inner) => {
                            tracing::error!("Bulk {:?} failed for artist {}: {:#}", request.action, id, inner);
                            "Internal error".to_string()
                        }
                        ArtistServiceError::NotFound(m)
                        | ArtistServiceError::Forbidden(m)
                        | ArtistServiceError::BadRequest(m) => m,
                        ArtistServiceError::ValidationError(fields) => fields.to_string(),
                    };
                    result.failed.push(BulkFailure { id, reason });
                }
            }
        }
        tracing::info!(
            "Bulk {:?}: {} succeeded, {} failed",
            request.action,
            result.succeeded.len(),
            result.failed.len()
        );
        result
    }

    async fn bulk_one(&self, action: BulkAction, id: i64) -> Result<(), ArtistServiceError> {
        let artist = self.load(id).await?;
        match (action.source_status(), action.target_status()) {
            (Some(from), Some(to)) => {
                if artist.status != from {
                    return Err(ArtistServiceError::BadRequest(format!(
                        "invalid status transition: {} -> {}",
                        artist.status, to
                    )));
                }
                self.apply_status(artist, to).await?;
            }
            _ => {
                self.set_featured(artist.id, action == BulkAction::Feature).await?;
            }
        }
        Ok(())
    }

    /// Remove a portfolio item from any artist
    pub async fn delete_portfolio_item(&self, id: i64) -> Result<(), ArtistServiceError> {
        let deleted = self
            .portfolio_repo
            .delete(id)
            .await
            .context("Failed to delete portfolio item")?;
        if !deleted {
            return Err(ArtistServiceError::NotFound(format!("Portfolio item {} not found", id)));
        }
        tracing::info!("Admin removed portfolio item {}", id);
        Ok(())
    }

    async fn apply_status(&self, artist: Artist, to: ArtistStatus) -> Result<Artist, ArtistServiceError> {
        check_transition(artist.status, to, Actor::Admin)?;
        self.artist_repo
            .set_status(artist.id, to)
            .await
            .context("Failed to change artist status")?;
        self.notifications
            .notify(NewNotification {
                recipient_id: artist.id,
                actor_id: None,
                kind: NotificationKind::Moderation,
                payload: json!({ "from": artist.status, "to": to }),
            })
            .await?;
        invalidate_trending(&self.cache).await;
        tracing::info!("Artist {} moved from {} to {} by admin", artist.id, artist.status, to);
        self.load(artist.id).await
    }

    async fn load(&self, id: i64) -> Result<Artist, ArtistServiceError> {
        self.artist_repo
            .get_by_id(id)
            .await
            .context("Failed to load artist")?
            .ok_or_else(|| ArtistServiceError::NotFound(format!("Artist {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheLayer, MemoryCache};
    use crate::db::repositories::test_support::{migrated_pool, seed_artist};
    use crate::db::repositories::{
        NotificationRepository, SqlxArtistRepository, SqlxNotificationRepository, SqlxPortfolioRepository,
    };
    use crate::models::{Location, Medium};
    use proptest::prelude::*;
    use std::time::Duration;

    #[test]
    fn test_transition_table() {
        use ArtistStatus::*;
        assert!(check_transition(Draft, Pending, Actor::Owner).is_ok());
        assert!(check_transition(Draft, Pending, Actor::Admin).is_err());
        assert!(check_transition(Pending, Draft, Actor::Owner).is_ok());
        assert!(check_transition(Pending, Draft, Actor::Admin).is_ok());
        assert!(check_transition(Pending, Approved, Actor::Admin).is_ok());
        assert!(check_transition(Pending, Approved, Actor::Owner).is_err());
        assert!(check_transition(Approved, Suspended, Actor::Admin).is_ok());
        assert!(check_transition(Suspended, Approved, Actor::Admin).is_ok());
        assert!(check_transition(Draft, Approved, Actor::Admin).is_err());
        assert!(check_transition(Suspended, Draft, Actor::Admin).is_err());
        assert!(check_transition(Approved, Approved, Actor::Admin).is_err());
    }

    fn any_status() -> impl Strategy<Value = ArtistStatus> {
        prop::sample::select(ArtistStatus::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn same_status_is_never_allowed(status in any_status()) {
            prop_assert!(check_transition(status, status, Actor::Admin).is_err());
            prop_assert!(check_transition(status, status, Actor::Owner).is_err());
        }

        #[test]
        fn owners_never_approve_or_suspend(from in any_status(), to in any_status()) {
            if matches!(to, ArtistStatus::Approved | ArtistStatus::Suspended) {
                prop_assert!(!is_allowed(from, to, Actor::Owner));
            }
        }
    }

    struct Fixture {
        pool: crate::db::DynDatabasePool,
        moderation: ModerationService,
        notifications: Arc<dyn NotificationRepository>,
        cache: SharedCache,
    }

    async fn fixture() -> Fixture {
        let pool = migrated_pool().await;
        let artist_repo = SqlxArtistRepository::boxed(pool.clone());
        let notifications = SqlxNotificationRepository::boxed(pool.clone());
        let cache: SharedCache = Arc::new(MemoryCache::new());
        let moderation = ModerationService::new(
            artist_repo.clone(),
            SqlxPortfolioRepository::boxed(pool.clone()),
            Arc::new(NotificationService::new(notifications.clone(), artist_repo)),
            cache.clone(),
        );
        Fixture {
            pool,
            moderation,
            notifications,
            cache,
        }
    }

    #[tokio::test]
    async fn test_set_status_notifies_and_invalidates() {
        let f = fixture().await;
        let artist = seed_artist(&f.pool, "pending", Medium::Painting, Location::GeorgeTown, ArtistStatus::Pending).await;
        f.cache
            .set("artists:trending:6", &vec![1, 2, 3], Duration::from_secs(60))
            .await
            .unwrap();

        let approved = f.moderation.set_status(artist.id, ArtistStatus::Approved).await.unwrap();
        assert_eq!(approved.status, ArtistStatus::Approved);

        let cached: Option<Vec<i32>> = f.cache.get("artists:trending:6").await.unwrap();
        assert!(cached.is_none());

        let (inbox, total) = f
            .notifications
            .list(artist.id, false, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(inbox[0].kind, NotificationKind::Moderation);
        assert_eq!(inbox[0].payload["to"], "approved");

        assert!(matches!(
            f.moderation.set_status(artist.id, ArtistStatus::Approved).await,
            Err(ArtistServiceError::BadRequest(_))
        ));
        assert!(matches!(
            f.moderation.set_status(404, ArtistStatus::Approved).await,
            Err(ArtistServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_bulk_reports_partial_failure() {
        let f = fixture().await;
        let a = seed_artist(&f.pool, "a", Medium::Painting, Location::GeorgeTown, ArtistStatus::Pending).await;
        let b = seed_artist(&f.pool, "b", Medium::Painting, Location::GeorgeTown, ArtistStatus::Draft).await;

        let result = f
            .moderation
            .bulk(&BulkRequest {
                action: BulkAction::Approve,
                ids: vec![a.id, b.id, 999],
            })
            .await;
        assert_eq!(result.succeeded, vec![a.id]);
        assert_eq!(result.failed.len(), 2);
        assert_eq!(result.failed[0].id, b.id);
        assert!(result.failed[0].reason.contains("invalid status transition"));
        assert_eq!(result.failed[1].id, 999);

        let result = f
            .moderation
            .bulk(&BulkRequest {
                action: BulkAction::Feature,
                ids: vec![a.id, b.id],
            })
            .await;
        assert_eq!(result.succeeded, vec![a.id, b.id]);
        let page = f
            .moderation
            .list(
                &ArtistFilter {
                    featured_only: true,
                    ..Default::default()
                },
                &ListParams::default(),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_delete_portfolio_item_missing() {
        let f = fixture().await;
        assert!(matches!(
            f.moderation.delete_portfolio_item(77).await,
            Err(ArtistServiceError::NotFound(_))
        ));
    }
}
