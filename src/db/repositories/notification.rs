//! Notification repository

use crate::db::{now, Backend, DynDatabasePool};
use crate::models::{ListParams, NewNotification, Notification, NotificationKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &NewNotification) -> Result<Notification>;

    /// Newest first, optionally unread only
    async fn list(
        &self,
        recipient_id: i64,
        unread_only: bool,
        params: &ListParams,
    ) -> Result<(Vec<Notification>, i64)>;

    async fn unread_count(&self, recipient_id: i64) -> Result<i64>;

    /// Mark one notification read; false if it does not belong to `recipient_id`
    async fn mark_read(&self, id: i64, recipient_id: i64) -> Result<bool>;

    /// Mark everything read, returning how many rows changed
    async fn mark_all_read(&self, recipient_id: i64) -> Result<u64>;
}

pub struct SqlxNotificationRepository {
    pool: DynDatabasePool,
}

impl SqlxNotificationRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn NotificationRepository> {
        Arc::new(Self::new(pool))
    }
}

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, actor_id, kind, payload, is_read, created_at";

#[async_trait]
impl NotificationRepository for SqlxNotificationRepository {
    async fn create(&self, notification: &NewNotification) -> Result<Notification> {
        let sql = r#"
            INSERT INTO notifications (recipient_id, actor_id, kind, payload, is_read, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
        "#;
        let ts = now();
        let payload = notification.payload.to_string();
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(notification.recipient_id)
                .bind(notification.actor_id)
                .bind(notification.kind.to_string())
                .bind(&payload)
                .bind(false)
                .bind(ts)
                .execute(pool)
                .await
                .context("Failed to create notification")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(notification.recipient_id)
                .bind(notification.actor_id)
                .bind(notification.kind.to_string())
                .bind(&payload)
                .bind(false)
                .bind(ts)
                .execute(pool)
                .await
                .context("Failed to create notification")?
                .last_insert_id() as i64,
        };

        Ok(Notification {
            id,
            recipient_id: notification.recipient_id,
            actor_id: notification.actor_id,
            kind: notification.kind,
            payload: notification.payload.clone(),
            is_read: false,
            created_at: ts,
            actor: None,
        })
    }

    async fn list(
        &self,
        recipient_id: i64,
        unread_only: bool,
        params: &ListParams,
    ) -> Result<(Vec<Notification>, i64)> {
        let unread = if unread_only { " AND is_read = 0" } else { "" };
        let sql = format!(
            "SELECT {} FROM notifications WHERE recipient_id = ?{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            NOTIFICATION_COLUMNS, unread
        );
        let count_sql = format!(
            "SELECT COUNT(*) AS count FROM notifications WHERE recipient_id = ?{}",
            unread
        );

        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(recipient_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list notifications")?;
                let total: i64 = sqlx::query(&count_sql).bind(recipient_id).fetch_one(pool).await?.get("count");
                let items = rows.iter().map(row_to_notification_sqlite).collect::<Result<Vec<_>>>()?;
                Ok((items, total))
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(recipient_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list notifications")?;
                let total: i64 = sqlx::query(&count_sql).bind(recipient_id).fetch_one(pool).await?.get("count");
                let items = rows.iter().map(row_to_notification_mysql).collect::<Result<Vec<_>>>()?;
                Ok((items, total))
            }
        }
    }

    async fn unread_count(&self, recipient_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM notifications WHERE recipient_id = ? AND is_read = 0";
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql).bind(recipient_id).fetch_one(pool).await?.get("count"),
            Backend::Mysql(pool) => sqlx::query(sql).bind(recipient_id).fetch_one(pool).await?.get("count"),
        };
        Ok(count)
    }

    async fn mark_read(&self, id: i64, recipient_id: i64) -> Result<bool> {
        // MySQL reports zero affected rows for an already-read notification.
        let exists_sql = "SELECT COUNT(*) AS count FROM notifications WHERE id = ? AND recipient_id = ?";
        let update_sql = "UPDATE notifications SET is_read = 1 WHERE id = ? AND recipient_id = ?";
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(update_sql).bind(id).bind(recipient_id).execute(pool).await?;
                sqlx::query(exists_sql).bind(id).bind(recipient_id).fetch_one(pool).await?.get("count")
            }
            Backend::Mysql(pool) => {
                sqlx::query(update_sql).bind(id).bind(recipient_id).execute(pool).await?;
                sqlx::query(exists_sql).bind(id).bind(recipient_id).fetch_one(pool).await?.get("count")
            }
        };
        Ok(count > 0)
    }

    async fn mark_all_read(&self, recipient_id: i64) -> Result<u64> {
        let sql = "UPDATE notifications SET is_read = 1 WHERE recipient_id = ? AND is_read = 0";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql).bind(recipient_id).execute(pool).await?.rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql).bind(recipient_id).execute(pool).await?.rows_affected(),
        };
        Ok(affected)
    }
}

fn parse_payload(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or(serde_json::Value::Null)
}

fn row_to_notification_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Notification> {
    let kind: String = row.get("kind");
    let payload: String = row.get("payload");
    Ok(Notification {
        id: row.get("id"),
        recipient_id: row.get("recipient_id"),
        actor_id: row.get("actor_id"),
        kind: NotificationKind::from_str(&kind)?,
        payload: parse_payload(&payload),
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
        actor: None,
    })
}

fn row_to_notification_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Notification> {
    let kind: String = row.get("kind");
    let payload: String = row.get("payload");
    Ok(Notification {
        id: row.get("id"),
        recipient_id: row.get("recipient_id"),
        actor_id: row.get("actor_id"),
        kind: NotificationKind::from_str(&kind)?,
        payload: parse_payload(&payload),
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
        actor: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{migrated_pool, seed_artist};
    use crate::models::{ArtistStatus, Location, Medium};
    use serde_json::json;

    #[tokio::test]
    async fn test_list_unread_and_mark() {
        let pool = migrated_pool().await;
        let a = seed_artist(&pool, "a", Medium::Digital, Location::Other, ArtistStatus::Approved).await;
        let b = seed_artist(&pool, "b", Medium::Digital, Location::Other, ArtistStatus::Approved).await;
        let repo = SqlxNotificationRepository::new(pool);

        let first = repo
            .create(&NewNotification {
                recipient_id: a.id,
                actor_id: Some(b.id),
                kind: NotificationKind::Follow,
                payload: json!({}),
            })
            .await
            .unwrap();
        repo.create(&NewNotification {
            recipient_id: a.id,
            actor_id: None,
            kind: NotificationKind::Moderation,
            payload: json!({"status": "approved"}),
        })
        .await
        .unwrap();

        let params = ListParams::new(1, 10);
        let (items, total) = repo.list(a.id, false, &params).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(items[0].kind, NotificationKind::Moderation);
        assert_eq!(items[0].payload["status"], "approved");
        assert_eq!(repo.unread_count(a.id).await.unwrap(), 2);

        assert!(repo.mark_read(first.id, a.id).await.unwrap());
        assert!(repo.mark_read(first.id, a.id).await.unwrap());
        assert!(!repo.mark_read(first.id, b.id).await.unwrap());
        assert_eq!(repo.unread_count(a.id).await.unwrap(), 1);

        let (unread, total) = repo.list(a.id, true, &params).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(unread[0].kind, NotificationKind::Moderation);

        assert_eq!(repo.mark_all_read(a.id).await.unwrap(), 1);
        assert_eq!(repo.unread_count(a.id).await.unwrap(), 0);
    }
}
