//! Service listing repository

use crate::db::{now, Backend, DynDatabasePool};
use crate::models::{PriceUnit, ServiceListing, ServiceListingInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait ListingRepository: Send + Sync {
    async fn create(&self, artist_id: i64, input: &ServiceListingInput) -> Result<ServiceListing>;

    async fn get_by_id(&self, id: i64) -> Result<Option<ServiceListing>>;

    async fn update(&self, id: i64, input: &ServiceListingInput) -> Result<Option<ServiceListing>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Listings of one artist, oldest first
    async fn list_by_artist(&self, artist_id: i64, active_only: bool) -> Result<Vec<ServiceListing>>;
}

pub struct SqlxListingRepository {
    pool: DynDatabasePool,
}

impl SqlxListingRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ListingRepository> {
        Arc::new(Self::new(pool))
    }
}

const LISTING_COLUMNS: &str =
    "id, artist_id, title, description, price_cents, price_unit, is_active, created_at, updated_at";

#[async_trait]
impl ListingRepository for SqlxListingRepository {
    async fn create(&self, artist_id: i64, input: &ServiceListingInput) -> Result<ServiceListing> {
        let sql = r#"
            INSERT INTO services (artist_id, title, description, price_cents, price_unit, is_active,
                created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#;
        let ts = now();
        let unit = input.price_unit.to_string();
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(artist_id)
                .bind(&input.title)
                .bind(&input.description)
                .bind(input.price_cents)
                .bind(&unit)
                .bind(input.is_active)
                .bind(ts)
                .bind(ts)
                .execute(pool)
                .await
                .context("Failed to create service listing")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(artist_id)
                .bind(&input.title)
                .bind(&input.description)
                .bind(input.price_cents)
                .bind(&unit)
                .bind(input.is_active)
                .bind(ts)
                .bind(ts)
                .execute(pool)
                .await
                .context("Failed to create service listing")?
                .last_insert_id() as i64,
        };

        Ok(ServiceListing {
            id,
            artist_id,
            title: input.title.clone(),
            description: input.description.clone(),
            price_cents: input.price_cents,
            price_unit: input.price_unit,
            is_active: input.is_active,
            created_at: ts,
            updated_at: ts,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ServiceListing>> {
        let sql = format!("SELECT {} FROM services WHERE id = ?", LISTING_COLUMNS);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
                row.as_ref().map(row_to_listing_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
                row.as_ref().map(row_to_listing_mysql).transpose()
            }
        }
    }

    async fn update(&self, id: i64, input: &ServiceListingInput) -> Result<Option<ServiceListing>> {
        let sql = r#"
            UPDATE services
            SET title = ?, description = ?, price_cents = ?, price_unit = ?, is_active = ?, updated_at = ?
            WHERE id = ?
        "#;
        let ts = now();
        let unit = input.price_unit.to_string();
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(sql)
                    .bind(&input.title)
                    .bind(&input.description)
                    .bind(input.price_cents)
                    .bind(&unit)
                    .bind(input.is_active)
                    .bind(ts)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update service listing")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql)
                    .bind(&input.title)
                    .bind(&input.description)
                    .bind(input.price_cents)
                    .bind(&unit)
                    .bind(input.is_active)
                    .bind(ts)
                    .bind(id)
                    .execute(pool)
                    .await
                    .context("Failed to update service listing")?;
            }
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let sql = "DELETE FROM services WHERE id = ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql).bind(id).execute(pool).await?.rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql).bind(id).execute(pool).await?.rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn list_by_artist(&self, artist_id: i64, active_only: bool) -> Result<Vec<ServiceListing>> {
        let active = if active_only { " AND is_active = 1" } else { "" };
        let sql = format!(
            "SELECT {} FROM services WHERE artist_id = ?{} ORDER BY created_at ASC, id ASC",
            LISTING_COLUMNS, active
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(&sql)
                .bind(artist_id)
                .fetch_all(pool)
                .await
                .context("Failed to list service listings")?
                .iter()
                .map(row_to_listing_sqlite)
                .collect(),
            Backend::Mysql(pool) => sqlx::query(&sql)
                .bind(artist_id)
                .fetch_all(pool)
                .await
                .context("Failed to list service listings")?
                .iter()
                .map(row_to_listing_mysql)
                .collect(),
        }
    }
}

fn row_to_listing_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<ServiceListing> {
    let unit: String = row.get("price_unit");
    Ok(ServiceListing {
        id: row.get("id"),
        artist_id: row.get("artist_id"),
        title: row.get("title"),
        description: row.get("description"),
        price_cents: row.get("price_cents"),
        price_unit: PriceUnit::from_str(&unit)?,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_listing_mysql(row: &sqlx::mysql::MySqlRow) -> Result<ServiceListing> {
    let unit: String = row.get("price_unit");
    Ok(ServiceListing {
        id: row.get("id"),
        artist_id: row.get("artist_id"),
        title: row.get("title"),
        description: row.get("description"),
        price_cents: row.get("price_cents"),
        price_unit: PriceUnit::from_str(&unit)?,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{migrated_pool, seed_artist};
    use crate::models::{ArtistStatus, Location, Medium};

    fn input(title: &str, active: bool) -> ServiceListingInput {
        ServiceListingInput {
            title: title.to_string(),
            description: "Half-day session".to_string(),
            price_cents: Some(15000),
            price_unit: PriceUnit::Hourly,
            is_active: active,
        }
    }

    #[tokio::test]
    async fn test_listing_crud_and_active_filter() {
        let pool = migrated_pool().await;
        let artist = seed_artist(&pool, "potter", Medium::Ceramics, Location::AirItam, ArtistStatus::Approved).await;
        let repo = SqlxListingRepository::new(pool);

        let workshop = repo.create(artist.id, &input("Wheel workshop", true)).await.unwrap();
        repo.create(artist.id, &input("Commission", false)).await.unwrap();

        let stored = repo.get_by_id(workshop.id).await.unwrap().unwrap();
        assert_eq!(stored.price_unit, PriceUnit::Hourly);
        assert!(stored.is_active);

        assert_eq!(repo.list_by_artist(artist.id, false).await.unwrap().len(), 2);
        let active = repo.list_by_artist(artist.id, true).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].title, "Wheel workshop");

        let changed = ServiceListingInput {
            price_unit: PriceUnit::OnRequest,
            price_cents: None,
            ..input("Wheel workshop", false)
        };
        let updated = repo.update(workshop.id, &changed).await.unwrap().unwrap();
        assert_eq!(updated.price_unit, PriceUnit::OnRequest);
        assert!(!updated.is_active);
        assert!(repo.list_by_artist(artist.id, true).await.unwrap().is_empty());

        assert!(repo.delete(workshop.id).await.unwrap());
        assert!(repo.get_by_id(workshop.id).await.unwrap().is_none());
    }
}
