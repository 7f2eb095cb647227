//! Notification service
//!
//! Stores notifications raised by other services and serves an artist's
//! inbox with actor summaries filled in.

use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::repositories::{ArtistRepository, NotificationRepository};
use crate::models::{ActorSummary, ListParams, NewNotification, Notification, PagedResult};
use crate::services::social::SocialServiceError;

pub struct NotificationService {
    notification_repo: Arc<dyn NotificationRepository>,
    artist_repo: Arc<dyn ArtistRepository>,
}

impl NotificationService {
    pub fn new(notification_repo: Arc<dyn NotificationRepository>, artist_repo: Arc<dyn ArtistRepository>) -> Self {
        Self {
            notification_repo,
            artist_repo,
        }
    }

    /// Store a notification
    pub async fn notify(&self, notification: NewNotification) -> anyhow::Result<Notification> {
        let created = self
            .notification_repo
            .create(&notification)
            .await
            .context("Failed to create notification")?;
        tracing::debug!(
            "Notified artist {} ({}) from {:?}",
            created.recipient_id,
            created.kind,
            created.actor_id
        );
        Ok(created)
    }

    /// Newest first, each with its actor's summary when there is one
    pub async fn list(
        &self,
        recipient_id: i64,
        unread_only: bool,
        params: &ListParams,
    ) -> Result<PagedResult<Notification>, SocialServiceError> {
        let (mut items, total) = self
            .notification_repo
            .list(recipient_id, unread_only, params)
            .await
            .context("Failed to list notifications")?;

        let mut actor_ids: Vec<i64> = items.iter().filter_map(|n| n.actor_id).collect();
        actor_ids.sort_unstable();
        actor_ids.dedup();

        let actors: HashMap<i64, ActorSummary> = self
            .artist_repo
            .get_many(&actor_ids)
            .await
            .context("Failed to load notification actors")?
            .into_iter()
            .map(|a| {
                (
                    a.id,
                    ActorSummary {
                        id: a.id,
                        avatar_url: a.display_avatar(),
                        name: a.name,
                        slug: a.slug,
                    },
                )
            })
            .collect();

        for item in &mut items {
            item.actor = item.actor_id.and_then(|id| actors.get(&id).cloned());
        }
        Ok(PagedResult::new(items, total, params))
    }

    pub async fn unread_count(&self, recipient_id: i64) -> Result<i64, SocialServiceError> {
        Ok(self
            .notification_repo
            .unread_count(recipient_id)
            .await
            .context("Failed to count notifications")?)
    }

    /// Mark one of the recipient's notifications read
    pub async fn mark_read(&self, id: i64, recipient_id: i64) -> Result<(), SocialServiceError> {
        let found = self
            .notification_repo
            .mark_read(id, recipient_id)
            .await
            .context("Failed to mark notification read")?;
        if found {
            Ok(())
        } else {
            Err(SocialServiceError::NotFound(format!("Notification {} not found", id)))
        }
    }

    /// Returns how many notifications changed
    pub async fn mark_all_read(&self, recipient_id: i64) -> Result<u64, SocialServiceError> {
        Ok(self
            .notification_repo
            .mark_all_read(recipient_id)
            .await
            .context("Failed to mark notifications read")?)
    }
}
