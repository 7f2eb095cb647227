//! Portfolio item repository

use crate::db::{now, Backend, DynDatabasePool};
use crate::models::{ListParams, Medium, PortfolioItem, PortfolioItemInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::str::FromStr;
use std::sync::Arc;

use super::placeholders;

#[async_trait]
pub trait PortfolioRepository: Send + Sync {
    async fn create(&self, artist_id: i64, input: &PortfolioItemInput) -> Result<PortfolioItem>;

    async fn get_by_id(&self, id: i64) -> Result<Option<PortfolioItem>>;

    /// Fetch several items at once, in no particular order
    async fn get_many(&self, ids: &[i64]) -> Result<Vec<PortfolioItem>>;

    /// Replace the editable fields; returns the stored item or `None` if it is gone
    async fn update(&self, id: i64, input: &PortfolioItemInput) -> Result<Option<PortfolioItem>>;

    /// Returns false when nothing was deleted
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Items of one artist, newest first
    async fn list_by_artist(&self, artist_id: i64, params: &ListParams) -> Result<(Vec<PortfolioItem>, i64)>;

    /// Apply `delta` to the like counter without going below zero
    async fn adjust_like_count(&self, id: i64, delta: i64) -> Result<()>;

    async fn count(&self) -> Result<i64>;
}

pub struct SqlxPortfolioRepository {
    pool: DynDatabasePool,
}

impl SqlxPortfolioRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PortfolioRepository> {
        Arc::new(Self::new(pool))
    }
}

const ITEM_COLUMNS: &str =
    "id, artist_id, title, description, image_url, medium, year, like_count, created_at, updated_at";

const INSERT_ITEM: &str = r#"
    INSERT INTO portfolio_items (artist_id, title, description, image_url, medium, year,
        like_count, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
"#;

const UPDATE_ITEM: &str = r#"
    UPDATE portfolio_items
    SET title = ?, description = ?, image_url = ?, medium = ?, year = ?, updated_at = ?
    WHERE id = ?
"#;

const ADJUST_LIKES: &str = r#"
    UPDATE portfolio_items
    SET like_count = CASE WHEN like_count + ? < 0 THEN 0 ELSE like_count + ? END
    WHERE id = ?
"#;

#[async_trait]
impl PortfolioRepository for SqlxPortfolioRepository {
    async fn create(&self, artist_id: i64, input: &PortfolioItemInput) -> Result<PortfolioItem> {
        let ts = now();
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(INSERT_ITEM)
                .bind(artist_id)
                .bind(&input.title)
                .bind(&input.description)
                .bind(&input.image_url)
                .bind(input.medium.to_string())
                .bind(input.year)
                .bind(ts)
                .bind(ts)
                .execute(pool)
                .await
                .context("Failed to create portfolio item")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(INSERT_ITEM)
                .bind(artist_id)
                .bind(&input.title)
                .bind(&input.description)
                .bind(&input.image_url)
                .bind(input.medium.to_string())
                .bind(input.year)
                .bind(ts)
                .bind(ts)
                .execute(pool)
                .await
                .context("Failed to create portfolio item")?
                .last_insert_id() as i64,
        };

        Ok(PortfolioItem {
            id,
            artist_id,
            title: input.title.clone(),
            description: input.description.clone(),
            image_url: input.image_url.clone(),
            medium: input.medium,
            year: input.year,
            like_count: 0,
            created_at: ts,
            updated_at: ts,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<PortfolioItem>> {
        let sql = format!("SELECT {} FROM portfolio_items WHERE id = ?", ITEM_COLUMNS);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
                row.as_ref().map(row_to_item_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
                row.as_ref().map(row_to_item_mysql).transpose()
            }
        }
    }

    async fn get_many(&self, ids: &[i64]) -> Result<Vec<PortfolioItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM portfolio_items WHERE id IN ({})",
            ITEM_COLUMNS,
            placeholders(ids.len())
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let mut query = sqlx::query(&sql);
                for id in ids {
                    query = query.bind(*id);
                }
                let rows = query.fetch_all(pool).await.context("Failed to fetch portfolio items")?;
                rows.iter().map(row_to_item_sqlite).collect()
            }
            Backend::Mysql(pool) => {
                let mut query = sqlx::query(&sql);
                for id in ids {
                    query = query.bind(*id);
                }
                let rows = query.fetch_all(pool).await.context("Failed to fetch portfolio items")?;
                rows.iter().map(row_to_item_mysql).collect()
            }
        }
    }

    async fn update(&self, id: i64, input: &PortfolioItemInput) -> Result<Option<PortfolioItem>> {
        let ts = now();
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(UPDATE_ITEM)
                    .bind(&input.title)
                    .bind(&input.description)
                    .bind(&input.image_url)
                    .bind(input.medium.to_string())
                    .bind(input.year)
                    .bind(ts)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update portfolio item")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(UPDATE_ITEM)
                    .bind(&input.title)
                    .bind(&input.description)
                    .bind(&input.image_url)
                    .bind(input.medium.to_string())
                    .bind(input.year)
                    .bind(ts)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update portfolio item")?;
            }
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM portfolio_items WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql).bind(id).execute(pool).await?.rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql).bind(id).execute(pool).await?.rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list_by_artist(&self, artist_id: i64, params: &ListParams) -> Result<(Vec<PortfolioItem>, i64)> {
        let sql = format!(
            "SELECT {} FROM portfolio_items WHERE artist_id = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            ITEM_COLUMNS
        );
        let count_sql = "SELECT COUNT(*) AS count FROM portfolio_items WHERE artist_id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(artist_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list portfolio items")?;
                let total: i64 = sqlx::query(count_sql).bind(artist_id).fetch_one(pool).await?.get("count");
                let items = rows.iter().map(row_to_item_sqlite).collect::<Result<Vec<_>>>()?;
                Ok((items, total))
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql)
                    .bind(artist_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list portfolio items")?;
                let total: i64 = sqlx::query(count_sql).bind(artist_id).fetch_one(pool).await?.get("count");
                let items = rows.iter().map(row_to_item_mysql).collect::<Result<Vec<_>>>()?;
                Ok((items, total))
            }
        }
    }

    async fn adjust_like_count(&self, id: i64, delta: i64) -> Result<()> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(ADJUST_LIKES)
                    .bind(delta)
                    .bind(delta)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update like count")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(ADJUST_LIKES)
                    .bind(delta)
                    .bind(delta)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update like count")?;
            }
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM portfolio_items";
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql).fetch_one(pool).await?.get("count"),
            Backend::Mysql(pool) => sqlx::query(sql).fetch_one(pool).await?.get("count"),
        };
        Ok(count)
    }
}

fn row_to_item_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<PortfolioItem> {
    let medium: String = row.get("medium");
    Ok(PortfolioItem {
        id: row.get("id"),
        artist_id: row.get("artist_id"),
        title: row.get("title"),
        description: row.get("description"),
        image_url: row.get("image_url"),
        medium: Medium::from_str(&medium)?,
        year: row.get("year"),
        like_count: row.get("like_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_item_mysql(row: &sqlx::mysql::MySqlRow) -> Result<PortfolioItem> {
    let medium: String = row.get("medium");
    Ok(PortfolioItem {
        id: row.get("id"),
        artist_id: row.get("artist_id"),
        title: row.get("title"),
        description: row.get("description"),
        image_url: row.get("image_url"),
        medium: Medium::from_str(&medium)?,
        year: row.get("year"),
        like_count: row.get("like_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{migrated_pool, seed_artist};
    use crate::models::{ArtistStatus, Location};

    fn input(title: &str) -> PortfolioItemInput {
        PortfolioItemInput {
            title: title.to_string(),
            description: "Oil on canvas".to_string(),
            image_url: "/uploads/x.jpg".to_string(),
            medium: Medium::Painting,
            year: Some(2023),
        }
    }

    #[tokio::test]
    async fn test_crud_roundtrip() {
        let pool = migrated_pool().await;
        let artist = seed_artist(&pool, "a", Medium::Painting, Location::AirItam, ArtistStatus::Approved).await;
        let repo = SqlxPortfolioRepository::new(pool);

        let item = repo.create(artist.id, &input("Kek Lok Si at dusk")).await.unwrap();
        assert_eq!(item.like_count, 0);

        let updated = repo
            .update(item.id, &PortfolioItemInput { year: None, ..input("Renamed") })
            .await
            .unwrap()
            .expect("missing after update");
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.year, None);

        assert!(repo.delete(item.id).await.unwrap());
        assert!(!repo.delete(item.id).await.unwrap());
        assert!(repo.get_by_id(item.id).await.unwrap().is_none());
        assert!(repo.update(item.id, &input("gone")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_like_counter() {
        let pool = migrated_pool().await;
        let artist = seed_artist(&pool, "a", Medium::Painting, Location::AirItam, ArtistStatus::Approved).await;
        let repo = SqlxPortfolioRepository::new(pool);

        let first = repo.create(artist.id, &input("one")).await.unwrap();
        let second = repo.create(artist.id, &input("two")).await.unwrap();

        let (items, total) = repo.list_by_artist(artist.id, &ListParams::new(1, 10)).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(items[0].id, second.id);

        repo.adjust_like_count(first.id, 1).await.unwrap();
        repo.adjust_like_count(first.id, -1).await.unwrap();
        repo.adjust_like_count(first.id, -1).await.unwrap();
        let reloaded = repo.get_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(reloaded.like_count, 0);

        assert_eq!(repo.get_many(&[first.id, second.id, 999]).await.unwrap().len(), 2);
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
