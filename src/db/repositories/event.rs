//! Event repository

use crate::db::{now, Backend, DynDatabasePool};
use crate::models::{Event, EventInput, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn create(&self, artist_id: i64, input: &EventInput) -> Result<Event>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Event>>;

    /// Replace the editable fields; `None` if the event is gone
    async fn update(&self, id: i64, input: &EventInput) -> Result<Option<Event>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Events of one artist, soonest start first
    async fn list_by_artist(&self, artist_id: i64, params: &ListParams) -> Result<(Vec<Event>, i64)>;

    /// Events of approved artists that have not finished by `from`
    async fn list_upcoming(&self, from: DateTime<Utc>, params: &ListParams) -> Result<(Vec<Event>, i64)>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxEventRepository {
    pool: DynDatabasePool,
}

impl SqlxEventRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EventRepository> {
        Arc::new(Self::new(pool))
    }
}

const EVENT_COLUMNS: &str = "e.id, e.artist_id, e.title, e.description, e.venue, e.starts_at, e.ends_at, \
    e.ticket_price_cents, e.created_at, e.updated_at";

const INSERT_EVENT: &str = r#"
    INSERT INTO events (artist_id, title, description, venue, starts_at, ends_at,
        ticket_price_cents, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_EVENT: &str = r#"
    UPDATE events
    SET title = ?, description = ?, venue = ?, starts_at = ?, ends_at = ?,
        ticket_price_cents = ?, updated_at = ?
    WHERE id = ?
"#;

const UPCOMING_WHERE: &str = "FROM events e JOIN artists a ON a.id = e.artist_id \
    WHERE a.status = 'approved' AND COALESCE(e.ends_at, e.starts_at) >= ?";

#[async_trait]
impl EventRepository for SqlxEventRepository {
    async fn create(&self, artist_id: i64, input: &EventInput) -> Result<Event> {
        let ts = now();
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(INSERT_EVENT)
                .bind(artist_id)
                .bind(&input.title)
                .bind(&input.description)
                .bind(&input.venue)
                .bind(input.starts_at)
                .bind(input.ends_at)
                .bind(input.ticket_price_cents)
                .bind(ts)
                .bind(ts)
                .execute(pool)
                .await
                .context("Failed to create event")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(INSERT_EVENT)
                .bind(artist_id)
                .bind(&input.title)
                .bind(&input.description)
                .bind(&input.venue)
                .bind(input.starts_at)
                .bind(input.ends_at)
                .bind(input.ticket_price_cents)
                .bind(ts)
                .bind(ts)
                .execute(pool)
                .await
                .context("Failed to create event")?
                .last_insert_id() as i64,
        };

        Ok(Event {
            id,
            artist_id,
            title: input.title.clone(),
            description: input.description.clone(),
            venue: input.venue.clone(),
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            ticket_price_cents: input.ticket_price_cents,
            created_at: ts,
            updated_at: ts,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Event>> {
        let sql = format!("SELECT {} FROM events e WHERE e.id = ?", EVENT_COLUMNS);
        let event = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await?
                .as_ref()
                .map(row_to_event_sqlite),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(pool)
                .await?
                .as_ref()
                .map(row_to_event_mysql),
        };
        Ok(event)
    }

    async fn update(&self, id: i64, input: &EventInput) -> Result<Option<Event>> {
        let ts = now();
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(UPDATE_EVENT)
                    .bind(&input.title)
                    .bind(&input.description)
                    .bind(&input.venue)
                    .bind(input.starts_at)
                    .bind(input.ends_at)
                    .bind(input.ticket_price_cents)
                    .bind(ts)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update event")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(UPDATE_EVENT)
                    .bind(&input.title)
                    .bind(&input.description)
                    .bind(&input.venue)
                    .bind(input.starts_at)
                    .bind(input.ends_at)
                    .bind(input.ticket_price_cents)
                    .bind(ts)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update event")?;
            }
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM events WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql).bind(id).execute(pool).await?.rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql).bind(id).execute(pool).await?.rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list_by_artist(&self, artist_id: i64, params: &ListParams) -> Result<(Vec<Event>, i64)> {
        let sql = format!(
            "SELECT {} FROM events e WHERE e.artist_id = ? ORDER BY e.starts_at ASC, e.id ASC LIMIT ? OFFSET ?",
            EVENT_COLUMNS
        );
        let count_sql = "SELECT COUNT(*) AS count FROM events WHERE artist_id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let events = sqlx::query(&sql)
                    .bind(artist_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list events")?
                    .iter()
                    .map(row_to_event_sqlite)
                    .collect();
                let total: i64 = sqlx::query(count_sql).bind(artist_id).fetch_one(pool).await?.get("count");
                Ok((events, total))
            }
            Backend::Mysql(pool) => {
                let events = sqlx::query(&sql)
                    .bind(artist_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list events")?
                    .iter()
                    .map(row_to_event_mysql)
                    .collect();
                let total: i64 = sqlx::query(count_sql).bind(artist_id).fetch_one(pool).await?.get("count");
                Ok((events, total))
            }
        }
    }

    async fn list_upcoming(&self, from: DateTime<Utc>, params: &ListParams) -> Result<(Vec<Event>, i64)> {
        let sql = format!(
            "SELECT {} {} ORDER BY e.starts_at ASC, e.id ASC LIMIT ? OFFSET ?",
            EVENT_COLUMNS, UPCOMING_WHERE
        );
        let count_sql = format!("SELECT COUNT(*) AS count {}", UPCOMING_WHERE);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let events = sqlx::query(&sql)
                    .bind(from)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list upcoming events")?
                    .iter()
                    .map(row_to_event_sqlite)
                    .collect();
                let total: i64 = sqlx::query(&count_sql).bind(from).fetch_one(pool).await?.get("count");
                Ok((events, total))
            }
            Backend::Mysql(pool) => {
                let events = sqlx::query(&sql)
                    .bind(from)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list upcoming events")?
                    .iter()
                    .map(row_to_event_mysql)
                    .collect();
                let total: i64 = sqlx::query(&count_sql).bind(from).fetch_one(pool).await?.get("count");
                Ok((events, total))
            }
        }
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM events";
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql).fetch_one(pool).await?.get("count"),
            Backend::Mysql(pool) => sqlx::query(sql).fetch_one(pool).await?.get("count"),
        };
        Ok(count)
    }
}

fn row_to_event_sqlite(row: &sqlx::sqlite::SqliteRow) -> Event {
    Event {
        id: row.get("id"),
        artist_id: row.get("artist_id"),
        title: row.get("title"),
        description: row.get("description"),
        venue: row.get("venue"),
        starts_at: row.get("starts_at"),
        ends_at: row.get("ends_at"),
        ticket_price_cents: row.get("ticket_price_cents"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_event_mysql(row: &sqlx::mysql::MySqlRow) -> Event {
    Event {
        id: row.get("id"),
        artist_id: row.get("artist_id"),
        title: row.get("title"),
        description: row.get("description"),
        venue: row.get("venue"),
        starts_at: row.get("starts_at"),
        ends_at: row.get("ends_at"),
        ticket_price_cents: row.get("ticket_price_cents"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
