//! Event service
//!
//! Exhibitions, open studios and workshops announced by artists.

use anyhow::Context;
use serde_json::json;
use std::sync::Arc;

use crate::db::now;
use crate::db::repositories::{ActivityRepository, ArtistRepository, EventRepository};
use crate::models::{ActivityKind, Artist, Event, EventInput, ListParams, NewActivity, PagedResult, User};
use crate::services::content::{ensure_owner, ensure_visible, ContentServiceError};
use crate::services::validation::FieldErrors;

pub struct EventService {
    event_repo: Arc<dyn EventRepository>,
    artist_repo: Arc<dyn ArtistRepository>,
    activity_repo: Arc<dyn ActivityRepository>,
}

impl EventService {
    pub fn new(
        event_repo: Arc<dyn EventRepository>,
        artist_repo: Arc<dyn ArtistRepository>,
        activity_repo: Arc<dyn ActivityRepository>,
    ) -> Self {
        Self {
            event_repo,
            artist_repo,
            activity_repo,
        }
    }

    pub async fn create(&self, owner: &Artist, input: EventInput) -> Result<Event, ContentServiceError> {
        validate(&input)?;
        let event = self
            .event_repo
            .create(owner.id, &input)
            .await
            .context("Failed to create event")?;

        self.activity_repo
            .create(&NewActivity {
                artist_id: owner.id,
                kind: ActivityKind::EventCreated,
                portfolio_item_id: None,
                payload: json!({
                    "event_id": event.id,
                    "title": event.title,
                    "venue": event.venue,
                    "starts_at": event.starts_at,
                }),
            })
            .await
            .context("Failed to record event activity")?;

        Ok(event)
    }

    pub async fn update(&self, owner: &Artist, id: i64, input: EventInput) -> Result<Event, ContentServiceError> {
        let event = self.load(id).await?;
        ensure_owner(owner, event.artist_id, "events")?;
        validate(&input)?;
        self.event_repo
            .update(id, &input)
            .await
            .context("Failed to update event")?
            .ok_or_else(|| not_found(id))
    }

    pub async fn delete(&self, owner: &Artist, id: i64) -> Result<(), ContentServiceError> {
        let event = self.load(id).await?;
        ensure_owner(owner, event.artist_id, "events")?;
        self.event_repo.delete(id).await.context("Failed to delete event")?;
        Ok(())
    }

    pub async fn get(&self, id: i64, viewer: Option<&User>) -> Result<Event, ContentServiceError> {
        let event = self.load(id).await?;
        let artist = self
            .artist_repo
            .get_by_id(event.artist_id)
            .await
            .context("Failed to load artist")?;
        ensure_visible(artist.as_ref(), viewer, || format!("Event {} not found", id))?;
        Ok(event)
    }

    pub async fn list_for_artist(
        &self,
        artist: &Artist,
        params: &ListParams,
    ) -> Result<PagedResult<Event>, ContentServiceError> {
        let (items, total) = self
            .event_repo
            .list_by_artist(artist.id, params)
            .await
            .context("Failed to list events")?;
        Ok(PagedResult::new(items, total, params))
    }

    /// Events of approved artists that have not finished yet, soonest first
    pub async fn upcoming(&self, params: &ListParams) -> Result<PagedResult<Event>, ContentServiceError> {
        let (items, total) = self
            .event_repo
            .list_upcoming(now(), params)
            .await
            .context("Failed to list upcoming events")?;
        Ok(PagedResult::new(items, total, params))
    }

    async fn load(&self, id: i64) -> Result<Event, ContentServiceError> {
        self.event_repo
            .get_by_id(id)
            .await
            .context("Failed to load event")?
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: i64) -> ContentServiceError {
    ContentServiceError::NotFound(format!("Event {} not found", id))
}

fn validate(input: &EventInput) -> Result<(), ContentServiceError> {
    let mut errors = FieldErrors::new();
    errors.require_text("title", &input.title, 200);
    errors.require_text("venue", &input.venue, 200);
    errors.max_len("description", &input.description, 2000);
    errors.non_negative("ticket_price_cents", input.ticket_price_cents);
    if matches!(input.ends_at, Some(ends_at) if ends_at < input.starts_at) {
        errors.add("ends_at", "must not be before starts_at");
    }
    errors.into_result().map_err(ContentServiceError::ValidationError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{migrated_pool, seed_artist};
    use crate::db::repositories::{SqlxActivityRepository, SqlxArtistRepository, SqlxEventRepository};
    use crate::models::{ArtistStatus, Location, Medium};
    use chrono::Duration;

    fn input(title: &str, days_ahead: i64) -> EventInput {
        let starts_at = now() + Duration::days(days_ahead);
        EventInput {
            title: title.to_string(),
            description: String::new(),
            venue: "Hin Bus Depot".to_string(),
            starts_at,
            ends_at: Some(starts_at + Duration::hours(3)),
            ticket_price_cents: None,
        }
    }

    async fn service(pool: &crate::db::DynDatabasePool) -> EventService {
        EventService::new(
            SqlxEventRepository::boxed(pool.clone()),
            SqlxArtistRepository::boxed(pool.clone()),
            SqlxActivityRepository::boxed(pool.clone()),
        )
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let pool = migrated_pool().await;
        let owner = seed_artist(&pool, "owner", Medium::Painting, Location::GeorgeTown, ArtistStatus::Approved).await;
        let other = seed_artist(&pool, "other", Medium::Painting, Location::GeorgeTown, ArtistStatus::Approved).await;
        let service = service(&pool).await;

        let event = service.create(&owner, input("Open studio", 3)).await.unwrap();
        assert!(matches!(
            service.update(&other, event.id, input("Hijack", 3)).await,
            Err(ContentServiceError::Forbidden(_))
        ));
        let updated = service.update(&owner, event.id, input("Open studio II", 4)).await.unwrap();
        assert_eq!(updated.title, "Open studio II");

        let upcoming = service.upcoming(&ListParams::default()).await.unwrap();
        assert_eq!(upcoming.total, 1);

        service.delete(&owner, event.id).await.unwrap();
        assert!(service.get(event.id, None).await.is_err());
    }

    #[tokio::test]
    async fn test_upcoming_skips_past_and_hidden() {
        let pool = migrated_pool().await;
        let approved = seed_artist(&pool, "approved", Medium::Painting, Location::GeorgeTown, ArtistStatus::Approved).await;
        let draft = seed_artist(&pool, "draft", Medium::Painting, Location::GeorgeTown, ArtistStatus::Draft).await;
        let service = service(&pool).await;

        service.create(&approved, input("Past", -10)).await.unwrap();
        let soon = service.create(&approved, input("Soon", 1)).await.unwrap();
        let hidden = service.create(&draft, input("Hidden", 1)).await.unwrap();

        let upcoming = service.upcoming(&ListParams::default()).await.unwrap();
        let ids: Vec<i64> = upcoming.items.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![soon.id]);
        assert!(matches!(
            service.get(hidden.id, None).await,
            Err(ContentServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_end_before_start_rejected() {
        let mut bad = input("Backwards", 2);
        bad.ends_at = Some(bad.starts_at - Duration::minutes(1));
        bad.ticket_price_cents = Some(-5);
        match validate(&bad).unwrap_err() {
            ContentServiceError::ValidationError(fields) => {
                assert!(fields.get("ends_at").is_some());
                assert!(fields.get("ticket_price_cents").is_some());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
