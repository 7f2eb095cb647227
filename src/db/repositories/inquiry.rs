//! Inquiry repository

use crate::db::{now, Backend, DynDatabasePool};
use crate::models::{Inquiry, InquiryInput, InquiryStatus, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait InquiryRepository: Send + Sync {
    async fn create(&self, service_id: i64, artist_id: i64, input: &InquiryInput) -> Result<Inquiry>;

    /// Inquiries addressed to one artist, newest first, optionally by status
    async fn list_by_artist(
        &self,
        artist_id: i64,
        status: Option<InquiryStatus>,
        params: &ListParams,
    ) -> Result<(Vec<Inquiry>, i64)>;

    /// Change the status of an inquiry owned by `artist_id`; `None` if there is no such inquiry
    async fn set_status(&self, id: i64, artist_id: i64, status: InquiryStatus) -> Result<Option<Inquiry>>;
}

pub struct SqlxInquiryRepository {
    pool: DynDatabasePool,
}

impl SqlxInquiryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn InquiryRepository> {
        Arc::new(Self::new(pool))
    }

    async fn get_owned(&self, id: i64, artist_id: i64) -> Result<Option<Inquiry>> {
        let sql = format!("SELECT {} FROM inquiries WHERE id = ? AND artist_id = ?", INQUIRY_COLUMNS);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql).bind(id).bind(artist_id).fetch_optional(pool).await?;
                row.as_ref().map(row_to_inquiry_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql).bind(id).bind(artist_id).fetch_optional(pool).await?;
                row.as_ref().map(row_to_inquiry_mysql).transpose()
            }
        }
    }
}

const INQUIRY_COLUMNS: &str = "id, service_id, artist_id, name, email, message, status, created_at";

#[async_trait]
impl InquiryRepository for SqlxInquiryRepository {
    async fn create(&self, service_id: i64, artist_id: i64, input: &InquiryInput) -> Result<Inquiry> {
        let sql = r#"
            INSERT INTO inquiries (service_id, artist_id, name, email, message, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        "#;
        let ts = now();
        let status = InquiryStatus::New.to_string();
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(service_id)
                .bind(artist_id)
                .bind(&input.name)
                .bind(&input.email)
                .bind(&input.message)
                .bind(&status)
                .bind(ts)
                .execute(pool)
                .await
                .context("Failed to create inquiry")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(service_id)
                .bind(artist_id)
                .bind(&input.name)
                .bind(&input.email)
                .bind(&input.message)
                .bind(&status)
                .bind(ts)
                .execute(pool)
                .await
                .context("Failed to create inquiry")?
                .last_insert_id() as i64,
        };

        Ok(Inquiry {
            id,
            service_id,
            artist_id,
            name: input.name.clone(),
            email: input.email.clone(),
            message: input.message.clone(),
            status: InquiryStatus::New,
            created_at: ts,
        })
    }

    async fn list_by_artist(
        &self,
        artist_id: i64,
        status: Option<InquiryStatus>,
        params: &ListParams,
    ) -> Result<(Vec<Inquiry>, i64)> {
        let status_clause = if status.is_some() { " AND status = ?" } else { "" };
        let sql = format!(
            "SELECT {} FROM inquiries WHERE artist_id = ?{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            INQUIRY_COLUMNS, status_clause
        );
        let count_sql = format!(
            "SELECT COUNT(*) AS count FROM inquiries WHERE artist_id = ?{}",
            status_clause
        );
        let status = status.map(|s| s.to_string());

        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let mut query = sqlx::query(&sql).bind(artist_id);
                let mut count_query = sqlx::query(&count_sql).bind(artist_id);
                if let Some(status) = &status {
                    query = query.bind(status.clone());
                    count_query = count_query.bind(status.clone());
                }
                let rows = query
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list inquiries")?;
                let total: i64 = count_query.fetch_one(pool).await?.get("count");
                let items = rows.iter().map(row_to_inquiry_sqlite).collect::<Result<Vec<_>>>()?;
                Ok((items, total))
            }
            Backend::Mysql(pool) => {
                let mut query = sqlx::query(&sql).bind(artist_id);
                let mut count_query = sqlx::query(&count_sql).bind(artist_id);
                if let Some(status) = &status {
                    query = query.bind(status.clone());
                    count_query = count_query.bind(status.clone());
                }
                let rows = query
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list inquiries")?;
                let total: i64 = count_query.fetch_one(pool).await?.get("count");
                let items = rows.iter().map(row_to_inquiry_mysql).collect::<Result<Vec<_>>>()?;
                Ok((items, total))
            }
        }
    }

    async fn set_status(&self, id: i64, artist_id: i64, status: InquiryStatus) -> Result<Option<Inquiry>> {
        let sql = "UPDATE inquiries SET status = ? WHERE id = ? AND artist_id = ?";
        let status = status.to_string();
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(sql).bind(&status).bind(id).bind(artist_id).execute(pool).await?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql).bind(&status).bind(id).bind(artist_id).execute(pool).await?;
            }
        }
        self.get_owned(id, artist_id).await
    }
}

fn row_to_inquiry_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Inquiry> {
    let status: String = row.get("status");
    Ok(Inquiry {
        id: row.get("id"),
        service_id: row.get("service_id"),
        artist_id: row.get("artist_id"),
        name: row.get("name"),
        email: row.get("email"),
        message: row.get("message"),
        status: InquiryStatus::from_str(&status)?,
        created_at: row.get("created_at"),
    })
}

fn row_to_inquiry_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Inquiry> {
    let status: String = row.get("status");
    Ok(Inquiry {
        id: row.get("id"),
        service_id: row.get("service_id"),
        artist_id: row.get("artist_id"),
        name: row.get("name"),
        email: row.get("email"),
        message: row.get("message"),
        status: InquiryStatus::from_str(&status)?,
        created_at: row.get("created_at"),
    })
}
