//! Activity repository
//!
//! Append-only log of artist activity read by the feed.

use crate::db::{now, Backend, DynDatabasePool};
use crate::models::{Activity, ActivityKind, FeedCursor, NewActivity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::str::FromStr;
use std::sync::Arc;

use super::placeholders;

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn create(&self, activity: &NewActivity) -> Result<Activity>;

    /// Activities by any of `author_ids`, newest first (ties by id descending),
    /// positioned after `before` when given, at most `limit` rows
    async fn list_for_authors(
        &self,
        author_ids: &[i64],
        before: Option<FeedCursor>,
        limit: i64,
    ) -> Result<Vec<Activity>>;
}

pub struct SqlxActivityRepository {
    pool: DynDatabasePool,
}

impl SqlxActivityRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ActivityRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ActivityRepository for SqlxActivityRepository {
    async fn create(&self, activity: &NewActivity) -> Result<Activity> {
        let sql = r#"
            INSERT INTO activities (artist_id, kind, portfolio_item_id, payload, created_at)
            VALUES (?, ?, ?, ?, ?)
        "#;
        let ts = now();
        let payload = activity.payload.to_string();
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(activity.artist_id)
                .bind(activity.kind.as_str())
                .bind(activity.portfolio_item_id)
                .bind(&payload)
                .bind(ts)
                .execute(pool)
                .await
                .context("Failed to record activity")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(activity.artist_id)
                .bind(activity.kind.as_str())
                .bind(activity.portfolio_item_id)
                .bind(&payload)
                .bind(ts)
                .execute(pool)
                .await
                .context("Failed to record activity")?
                .last_insert_id() as i64,
        };

        Ok(Activity {
            id,
            artist_id: activity.artist_id,
            kind: activity.kind,
            portfolio_item_id: activity.portfolio_item_id,
            payload: activity.payload.clone(),
            created_at: ts,
        })
    }

    async fn list_for_authors(
        &self,
        author_ids: &[i64],
        before: Option<FeedCursor>,
        limit: i64,
    ) -> Result<Vec<Activity>> {
        if author_ids.is_empty() || limit <= 0 {
            return Ok(Vec::new());
        }
        let cursor = match before {
            Some(FeedCursor { id: Some(_), .. }) => " AND (created_at < ? OR (created_at = ? AND id < ?))",
            Some(FeedCursor { id: None, .. }) => " AND created_at < ?",
            None => "",
        };
        let sql = format!(
            "SELECT id, artist_id, kind, portfolio_item_id, payload, created_at FROM activities \
             WHERE artist_id IN ({}){} ORDER BY created_at DESC, id DESC LIMIT ?",
            placeholders(author_ids.len()),
            cursor
        );

        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let mut query = sqlx::query(&sql);
                for id in author_ids {
                    query = query.bind(*id);
                }
                if let Some(before) = before {
                    query = query.bind(before.created_at);
                    if let Some(id) = before.id {
                        query = query.bind(before.created_at).bind(id);
                    }
                }
                let rows = query
                    .bind(limit)
                    .fetch_all(pool)
                    .await
                    .context("Failed to load activities")?;
                rows.iter().map(row_to_activity_sqlite).collect()
            }
            Backend::Mysql(pool) => {
                let mut query = sqlx::query(&sql);
                for id in author_ids {
                    query = query.bind(*id);
                }
                if let Some(before) = before {
                    query = query.bind(before.created_at);
                    if let Some(id) = before.id {
                        query = query.bind(before.created_at).bind(id);
                    }
                }
                let rows = query
                    .bind(limit)
                    .fetch_all(pool)
                    .await
                    .context("Failed to load activities")?;
                rows.iter().map(row_to_activity_mysql).collect()
            }
        }
    }
}

fn row_to_activity_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Activity> {
    let kind: String = row.get("kind");
    let payload: String = row.get("payload");
    Ok(Activity {
        id: row.get("id"),
        artist_id: row.get("artist_id"),
        kind: ActivityKind::from_str(&kind)?,
        portfolio_item_id: row.get("portfolio_item_id"),
        payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
        created_at: row.get("created_at"),
    })
}

fn row_to_activity_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Activity> {
    let kind: String = row.get("kind");
    let payload: String = row.get("payload");
    Ok(Activity {
        id: row.get("id"),
        artist_id: row.get("artist_id"),
        kind: ActivityKind::from_str(&kind)?,
        portfolio_item_id: row.get("portfolio_item_id"),
        payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{migrated_pool, seed_artist};
    use crate::models::{ArtistStatus, Location, Medium};
    use serde_json::json;

    fn new_activity(artist_id: i64, n: i64) -> NewActivity {
        NewActivity {
            artist_id,
            kind: ActivityKind::ProfileUpdated,
            portfolio_item_id: None,
            payload: json!({ "n": n }),
        }
    }

    #[tokio::test]
    async fn test_list_for_authors_filters_and_orders() {
        let pool = migrated_pool().await;
        let a = seed_artist(&pool, "a", Medium::Digital, Location::Other, ArtistStatus::Approved).await;
        let b = seed_artist(&pool, "b", Medium::Digital, Location::Other, ArtistStatus::Approved).await;
        let c = seed_artist(&pool, "c", Medium::Digital, Location::Other, ArtistStatus::Approved).await;
        let repo = SqlxActivityRepository::new(pool);

        for n in 0..3 {
            repo.create(&new_activity(a.id, n)).await.unwrap();
            repo.create(&new_activity(b.id, n)).await.unwrap();
            repo.create(&new_activity(c.id, n)).await.unwrap();
        }

        let items = repo.list_for_authors(&[a.id, b.id], None, 10).await.unwrap();
        assert_eq!(items.len(), 6);
        assert!(items.iter().all(|x| x.artist_id != c.id));
        assert!(items
            .windows(2)
            .all(|w| (w[0].created_at, w[0].id) > (w[1].created_at, w[1].id)));

        let limited = repo.list_for_authors(&[a.id], None, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].payload["n"], 2);

        assert!(repo.list_for_authors(&[], None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_before_cursor_is_exclusive() {
        let pool = migrated_pool().await;
        let a = seed_artist(&pool, "a", Medium::Digital, Location::Other, ArtistStatus::Approved).await;
        let repo = SqlxActivityRepository::new(pool);

        let first = repo.create(&new_activity(a.id, 0)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = repo.create(&new_activity(a.id, 1)).await.unwrap();

        let older = repo
            .list_for_authors(&[a.id], Some(FeedCursor::after(&second)), 10)
            .await
            .unwrap();
        assert_eq!(older.len(), 1);
        assert_eq!(older[0].id, first.id);

        let none = repo
            .list_for_authors(&[a.id], Some(FeedCursor::after(&first)), 10)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_cursor_splits_equal_timestamps_by_id() {
        let pool = migrated_pool().await;
        let a = seed_artist(&pool, "a", Medium::Digital, Location::Other, ArtistStatus::Approved).await;
        let repo = SqlxActivityRepository::new(pool.clone());

        let first = repo.create(&new_activity(a.id, 0)).await.unwrap();
        let second = repo.create(&new_activity(a.id, 1)).await.unwrap();
        let Backend::Sqlite(sqlite) = pool.backend() else {
            panic!("expected sqlite backend");
        };
        sqlx::query("UPDATE activities SET created_at = (SELECT created_at FROM activities WHERE id = ?) WHERE id = ?")
            .bind(first.id)
            .bind(second.id)
            .execute(sqlite)
            .await
            .unwrap();

        let page = repo.list_for_authors(&[a.id], None, 1).await.unwrap();
        assert_eq!(page[0].id, second.id);

        let rest = repo
            .list_for_authors(&[a.id], Some(FeedCursor::after(&page[0])), 10)
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, first.id);

        let bare = FeedCursor {
            created_at: page[0].created_at,
            id: None,
        };
        assert!(repo.list_for_authors(&[a.id], Some(bare), 10).await.unwrap().is_empty());
    }
}
