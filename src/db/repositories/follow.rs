//! Follow edge repository
//!
//! Edges are unique per (follower, followed) pair; inserts use
//! insert-or-ignore so concurrent duplicate follows collapse into one row.

use crate::db::{now, Backend, DynDatabasePool};
use crate::models::ListParams;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Insert the edge; returns true if a new row was written
    async fn insert(&self, follower_id: i64, followed_id: i64) -> Result<bool>;

    /// Remove the edge; returns true if a row was deleted
    async fn delete(&self, follower_id: i64, followed_id: i64) -> Result<bool>;

    async fn exists(&self, follower_id: i64, followed_id: i64) -> Result<bool>;

    /// IDs of every artist `follower_id` follows
    async fn following_ids(&self, follower_id: i64) -> Result<Vec<i64>>;

    /// Follower IDs of `artist_id`, most recent first, with the total
    async fn list_followers(&self, artist_id: i64, params: &ListParams) -> Result<(Vec<i64>, i64)>;

    /// IDs `artist_id` follows, most recent first, with the total
    async fn list_following(&self, artist_id: i64, params: &ListParams) -> Result<(Vec<i64>, i64)>;

    /// `(followed_id, count)` for follow edges created at or after `since`
    async fn recent_counts(&self, since: DateTime<Utc>) -> Result<Vec<(i64, i64)>>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxFollowRepository {
    pool: DynDatabasePool,
}

impl SqlxFollowRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn FollowRepository> {
        Arc::new(Self::new(pool))
    }

    /// Shared body of the two paginated edge listings
    async fn list_edges(
        &self,
        select_col: &str,
        match_col: &str,
        artist_id: i64,
        params: &ListParams,
    ) -> Result<(Vec<i64>, i64)> {
        let sql = format!(
            "SELECT {} AS other_id FROM follows WHERE {} = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            select_col, match_col
        );
        let count_sql = format!("SELECT COUNT(*) AS count FROM follows WHERE {} = ?", match_col);

        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let ids: Vec<i64> = sqlx::query(&sql)
                    .bind(artist_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list follow edges")?
                    .iter()
                    .map(|row| row.get("other_id"))
                    .collect();
                let total: i64 = sqlx::query(&count_sql).bind(artist_id).fetch_one(pool).await?.get("count");
                Ok((ids, total))
            }
            Backend::Mysql(pool) => {
                let ids: Vec<i64> = sqlx::query(&sql)
                    .bind(artist_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list follow edges")?
                    .iter()
                    .map(|row| row.get("other_id"))
                    .collect();
                let total: i64 = sqlx::query(&count_sql).bind(artist_id).fetch_one(pool).await?.get("count");
                Ok((ids, total))
            }
        }
    }
}

#[async_trait]
impl FollowRepository for SqlxFollowRepository {
    async fn insert(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        let ts = now();
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(
                "INSERT OR IGNORE INTO follows (follower_id, followed_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(follower_id)
            .bind(followed_id)
            .bind(ts)
            .execute(pool)
            .await
            .context("Failed to insert follow")?
            .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(
                "INSERT IGNORE INTO follows (follower_id, followed_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(follower_id)
            .bind(followed_id)
            .bind(ts)
            .execute(pool)
            .await
            .context("Failed to insert follow")?
            .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn delete(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        let sql = "DELETE FROM follows WHERE follower_id = ? AND followed_id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(follower_id)
                .bind(followed_id)
                .execute(pool)
                .await?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(follower_id)
                .bind(followed_id)
                .execute(pool)
                .await?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn exists(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM follows WHERE follower_id = ? AND followed_id = ?";
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(follower_id)
                .bind(followed_id)
                .fetch_one(pool)
                .await?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(follower_id)
                .bind(followed_id)
                .fetch_one(pool)
                .await?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn following_ids(&self, follower_id: i64) -> Result<Vec<i64>> {
        let sql = "SELECT followed_id FROM follows WHERE follower_id = ?";
        let ids: Vec<i64> = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(follower_id)
                .fetch_all(pool)
                .await
                .context("Failed to load following set")?
                .iter()
                .map(|row| row.get("followed_id"))
                .collect(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(follower_id)
                .fetch_all(pool)
                .await
                .context("Failed to load following set")?
                .iter()
                .map(|row| row.get("followed_id"))
                .collect(),
        };
        Ok(ids)
    }

    async fn list_followers(&self, artist_id: i64, params: &ListParams) -> Result<(Vec<i64>, i64)> {
        self.list_edges("follower_id", "followed_id", artist_id, params).await
    }

    async fn list_following(&self, artist_id: i64, params: &ListParams) -> Result<(Vec<i64>, i64)> {
        self.list_edges("followed_id", "follower_id", artist_id, params).await
    }

    async fn recent_counts(&self, since: DateTime<Utc>) -> Result<Vec<(i64, i64)>> {
        let sql = "SELECT followed_id, COUNT(*) AS count FROM follows WHERE created_at >= ? GROUP BY followed_id";
        let counts: Vec<(i64, i64)> = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(since)
                .fetch_all(pool)
                .await
                .context("Failed to count recent follows")?
                .iter()
                .map(|row| (row.get("followed_id"), row.get("count")))
                .collect(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(since)
                .fetch_all(pool)
                .await
                .context("Failed to count recent follows")?
                .iter()
                .map(|row| (row.get("followed_id"), row.get("count")))
                .collect(),
        };
        Ok(counts)
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM follows";
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql).fetch_one(pool).await?.get("count"),
            Backend::Mysql(pool) => sqlx::query(sql).fetch_one(pool).await?.get("count"),
        };
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{migrated_pool, seed_artist};
    use crate::models::{ArtistStatus, Location, Medium};
    use chrono::Duration;

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let pool = migrated_pool().await;
        let a = seed_artist(&pool, "a", Medium::Digital, Location::Other, ArtistStatus::Approved).await;
        let b = seed_artist(&pool, "b", Medium::Digital, Location::Other, ArtistStatus::Approved).await;
        let repo = SqlxFollowRepository::new(pool);

        assert!(repo.insert(a.id, b.id).await.unwrap());
        assert!(!repo.insert(a.id, b.id).await.unwrap());
        assert!(repo.exists(a.id, b.id).await.unwrap());
        assert!(!repo.exists(b.id, a.id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);

        assert!(repo.delete(a.id, b.id).await.unwrap());
        assert!(!repo.delete(a.id, b.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_edge_listings() {
        let pool = migrated_pool().await;
        let a = seed_artist(&pool, "a", Medium::Digital, Location::Other, ArtistStatus::Approved).await;
        let b = seed_artist(&pool, "b", Medium::Digital, Location::Other, ArtistStatus::Approved).await;
        let c = seed_artist(&pool, "c", Medium::Digital, Location::Other, ArtistStatus::Approved).await;
        let repo = SqlxFollowRepository::new(pool);

        repo.insert(a.id, c.id).await.unwrap();
        repo.insert(b.id, c.id).await.unwrap();
        repo.insert(a.id, b.id).await.unwrap();

        let mut following = repo.following_ids(a.id).await.unwrap();
        following.sort();
        assert_eq!(following, vec![b.id, c.id]);

        let (followers, total) = repo.list_followers(c.id, &ListParams::new(1, 10)).await.unwrap();
        assert_eq!(total, 2);
        assert!(followers.contains(&a.id) && followers.contains(&b.id));

        let (page, total) = repo.list_following(a.id, &ListParams::new(2, 1)).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);
    }

    #[tokio::test]
    async fn test_recent_counts_window() {
        let pool = migrated_pool().await;
        let a = seed_artist(&pool, "a", Medium::Digital, Location::Other, ArtistStatus::Approved).await;
        let b = seed_artist(&pool, "b", Medium::Digital, Location::Other, ArtistStatus::Approved).await;
        let c = seed_artist(&pool, "c", Medium::Digital, Location::Other, ArtistStatus::Approved).await;
        let repo = SqlxFollowRepository::new(pool);

        repo.insert(a.id, c.id).await.unwrap();
        repo.insert(b.id, c.id).await.unwrap();
        repo.insert(c.id, a.id).await.unwrap();

        let mut counts = repo.recent_counts(now() - Duration::days(7)).await.unwrap();
        counts.sort();
        assert_eq!(counts, vec![(a.id, 1), (c.id, 2)]);

        let future = repo.recent_counts(now() + Duration::days(1)).await.unwrap();
        assert!(future.is_empty());
    }
}
