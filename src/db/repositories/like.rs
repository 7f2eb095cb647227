//! Like repository
//!
//! One row per (artist, portfolio item) pair.

use crate::db::{now, Backend, DynDatabasePool};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

use super::placeholders;

#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Insert the like; returns true if a new row was written
    async fn insert(&self, artist_id: i64, item_id: i64) -> Result<bool>;

    /// Remove the like; returns true if a row was deleted
    async fn delete(&self, artist_id: i64, item_id: i64) -> Result<bool>;

    async fn exists(&self, artist_id: i64, item_id: i64) -> Result<bool>;

    /// Which of `item_ids` the artist has liked
    async fn liked_item_ids(&self, artist_id: i64, item_ids: &[i64]) -> Result<Vec<i64>>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxLikeRepository {
    pool: DynDatabasePool,
}

impl SqlxLikeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LikeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LikeRepository for SqlxLikeRepository {
    async fn insert(&self, artist_id: i64, item_id: i64) -> Result<bool> {
        let ts = now();
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query("INSERT OR IGNORE INTO likes (artist_id, item_id, created_at) VALUES (?, ?, ?)")
                    .bind(artist_id)
                    .bind(item_id)
                    .bind(ts)
                    .execute(pool)
                    .await
                    .context("Failed to insert like")?
                    .rows_affected()
            }
            Backend::Mysql(pool) => {
                sqlx::query("INSERT IGNORE INTO likes (artist_id, item_id, created_at) VALUES (?, ?, ?)")
                    .bind(artist_id)
                    .bind(item_id)
                    .bind(ts)
                    .execute(pool)
                    .await
                    .context("Failed to insert like")?
                    .rows_affected()
            }
        };
        Ok(affected > 0)
    }

    async fn delete(&self, artist_id: i64, item_id: i64) -> Result<bool> {
        let sql = "DELETE FROM likes WHERE artist_id = ? AND item_id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(artist_id)
                .bind(item_id)
                .execute(pool)
                .await?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(artist_id)
                .bind(item_id)
                .execute(pool)
                .await?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn exists(&self, artist_id: i64, item_id: i64) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM likes WHERE artist_id = ? AND item_id = ?";
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(artist_id)
                .bind(item_id)
                .fetch_one(pool)
                .await?
                .get("count"),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(artist_id)
                .bind(item_id)
                .fetch_one(pool)
                .await?
                .get("count"),
        };
        Ok(count > 0)
    }

    async fn liked_item_ids(&self, artist_id: i64, item_ids: &[i64]) -> Result<Vec<i64>> {
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT item_id FROM likes WHERE artist_id = ? AND item_id IN ({})",
            placeholders(item_ids.len())
        );
        let ids: Vec<i64> = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let mut query = sqlx::query(&sql).bind(artist_id);
                for id in item_ids {
                    query = query.bind(*id);
                }
                query
                    .fetch_all(pool)
                    .await
                    .context("Failed to look up likes")?
                    .iter()
                    .map(|row| row.get("item_id"))
                    .collect()
            }
            Backend::Mysql(pool) => {
                let mut query = sqlx::query(&sql).bind(artist_id);
                for id in item_ids {
                    query = query.bind(*id);
                }
                query
                    .fetch_all(pool)
                    .await
                    .context("Failed to look up likes")?
                    .iter()
                    .map(|row| row.get("item_id"))
                    .collect()
            }
        };
        Ok(ids)
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM likes";
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
    use crate::db::repositories::{PortfolioRepository, SqlxPortfolioRepository};
    use crate::models::{ArtistStatus, Location, Medium, PortfolioItemInput};

    #[tokio::test]
    async fn test_like_lifecycle() {
        let pool = migrated_pool().await;
        let a = seed_artist(&pool, "a", Medium::Textile, Location::BalikPulau, ArtistStatus::Approved).await;
        let items = SqlxPortfolioRepository::new(pool.clone());
        let mut ids = Vec::new();
        for title in ["batik", "songket"] {
            let item = items
                .create(
                    a.id,
                    &PortfolioItemInput {
                        title: title.to_string(),
                        description: String::new(),
                        image_url: "/uploads/t.png".to_string(),
                        medium: Medium::Textile,
                        year: None,
                    },
                )
                .await
                .unwrap();
            ids.push(item.id);
        }
        let repo = SqlxLikeRepository::new(pool);

        assert!(repo.insert(a.id, ids[0]).await.unwrap());
        assert!(!repo.insert(a.id, ids[0]).await.unwrap());
        assert!(repo.exists(a.id, ids[0]).await.unwrap());
        assert_eq!(repo.liked_item_ids(a.id, &ids).await.unwrap(), vec![ids[0]]);
        assert!(repo.liked_item_ids(a.id, &[]).await.unwrap().is_empty());
        assert_eq!(repo.count().await.unwrap(), 1);

        assert!(repo.delete(a.id, ids[0]).await.unwrap());
        assert!(!repo.delete(a.id, ids[0]).await.unwrap());
    }
}
