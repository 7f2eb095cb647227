//! Artist repository
//!
//! Database operations for artist profiles: directory queries, moderation
//! status changes, denormalized follower counters and the bounded candidate
//! sets used by trending and similar scoring.

use crate::db::{now, Backend, DynDatabasePool};
use crate::models::{Artist, ArtistFilter, ArtistStatus, ListParams, Location, Medium};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

use super::placeholders;

/// Artist repository trait
#[async_trait]
pub trait ArtistRepository: Send + Sync {
    /// Insert a new profile; id and timestamps of the argument are ignored
    async fn create(&self, artist: &Artist) -> Result<Artist>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Artist>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Artist>>;

    /// Profile owned by a user account
    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Artist>>;

    /// Fetch several artists at once, in no particular order
    async fn get_many(&self, ids: &[i64]) -> Result<Vec<Artist>>;

    async fn slug_exists(&self, slug: &str) -> Result<bool>;

    /// Persist the editable profile fields of `artist`
    async fn update_profile(&self, artist: &Artist) -> Result<Artist>;

    /// Returns false when the artist does not exist
    async fn set_status(&self, id: i64, status: ArtistStatus) -> Result<bool>;

    /// Returns false when the artist does not exist
    async fn set_featured(&self, id: i64, featured: bool) -> Result<bool>;

    /// Filtered, paginated listing with the total match count
    async fn list(&self, filter: &ArtistFilter, params: &ListParams) -> Result<(Vec<Artist>, i64)>;

    /// Up to `limit` approved artists, most recently updated first
    async fn list_approved_candidates(&self, limit: i64) -> Result<Vec<Artist>>;

    /// Apply `delta` to `followed.follower_count` and `follower.following_count`,
    /// never letting either drop below zero
    async fn adjust_follow_counts(&self, follower_id: i64, followed_id: i64, delta: i64) -> Result<()>;

    /// Number of profiles in each status
    async fn count_by_status(&self) -> Result<Vec<(ArtistStatus, i64)>>;
}

/// SQLx-based artist repository implementation
pub struct SqlxArtistRepository {
    pool: DynDatabasePool,
}

impl SqlxArtistRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArtistRepository> {
        Arc::new(Self::new(pool))
    }
}

const ARTIST_COLUMNS: &str = "id, user_id, name, slug, bio, avatar_url, website, contact_email, \
    primary_medium, location, status, featured, follower_count, following_count, created_at, updated_at";

const INSERT_ARTIST: &str = r#"
    INSERT INTO artists (user_id, name, slug, bio, avatar_url, website, contact_email,
        primary_medium, location, status, featured, follower_count, following_count,
        created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?, ?)
"#;

const UPDATE_PROFILE: &str = r#"
    UPDATE artists
    SET name = ?, slug = ?, bio = ?, avatar_url = ?, website = ?, contact_email = ?,
        primary_medium = ?, location = ?, updated_at = ?
    WHERE id = ?
"#;

const ADJUST_FOLLOWERS: &str = r#"
    UPDATE artists
    SET follower_count = CASE WHEN follower_count + ? < 0 THEN 0 ELSE follower_count + ? END
    WHERE id = ?
"#;

const ADJUST_FOLLOWING: &str = r#"
    UPDATE artists
    SET following_count = CASE WHEN following_count + ? < 0 THEN 0 ELSE following_count + ? END
    WHERE id = ?
"#;

/// WHERE clause and its bind values for a directory filter.
///
/// Both dialects use `?` placeholders, so the same text serves SQLite and MySQL.
fn filter_clause(filter: &ArtistFilter) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut args = Vec::new();

    if let Some(status) = filter.status {
        conditions.push("status = ?");
        args.push(status.to_string());
    }
    if let Some(medium) = filter.medium {
        conditions.push("primary_medium = ?");
        args.push(medium.to_string());
    }
    if let Some(location) = filter.location {
        conditions.push("location = ?");
        args.push(location.to_string());
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        conditions.push("(LOWER(name) LIKE ? OR LOWER(bio) LIKE ?)");
        let pattern = format!("%{}%", q.to_lowercase());
        args.push(pattern.clone());
        args.push(pattern);
    }
    if filter.featured_only {
        conditions.push("featured = 1");
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (clause, args)
}

#[async_trait]
impl ArtistRepository for SqlxArtistRepository {
    async fn create(&self, artist: &Artist) -> Result<Artist> {
        let ts = now();
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => {
                bind_insert_sqlite(sqlx::query(INSERT_ARTIST), artist, ts)
                    .execute(pool)
                    .await
                    .context("Failed to create artist")?
                    .last_insert_rowid()
            }
            Backend::Mysql(pool) => {
                bind_insert_mysql(sqlx::query(INSERT_ARTIST), artist, ts)
                    .execute(pool)
                    .await
                    .context("Failed to create artist")?
                    .last_insert_id() as i64
            }
        };

        Ok(Artist {
            id,
            follower_count: 0,
            following_count: 0,
            created_at: ts,
            updated_at: ts,
            ..artist.clone()
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Artist>> {
        let sql = format!("SELECT {} FROM artists WHERE id = ?", ARTIST_COLUMNS);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
                row.as_ref().map(row_to_artist_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
                row.as_ref().map(row_to_artist_mysql).transpose()
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Artist>> {
        let sql = format!("SELECT {} FROM artists WHERE slug = ?", ARTIST_COLUMNS);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql).bind(slug).fetch_optional(pool).await?;
                row.as_ref().map(row_to_artist_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql).bind(slug).fetch_optional(pool).await?;
                row.as_ref().map(row_to_artist_mysql).transpose()
            }
        }
    }

    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Artist>> {
        let sql = format!("SELECT {} FROM artists WHERE user_id = ?", ARTIST_COLUMNS);
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let row = sqlx::query(&sql).bind(user_id).fetch_optional(pool).await?;
                row.as_ref().map(row_to_artist_sqlite).transpose()
            }
            Backend::Mysql(pool) => {
                let row = sqlx::query(&sql).bind(user_id).fetch_optional(pool).await?;
                row.as_ref().map(row_to_artist_mysql).transpose()
            }
        }
    }

    async fn get_many(&self, ids: &[i64]) -> Result<Vec<Artist>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM artists WHERE id IN ({})",
            ARTIST_COLUMNS,
            placeholders(ids.len())
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let mut query = sqlx::query(&sql);
                for id in ids {
                    query = query.bind(*id);
                }
                let rows = query.fetch_all(pool).await.context("Failed to fetch artists")?;
                rows.iter().map(row_to_artist_sqlite).collect()
            }
            Backend::Mysql(pool) => {
                let mut query = sqlx::query(&sql);
                for id in ids {
                    query = query.bind(*id);
                }
                let rows = query.fetch_all(pool).await.context("Failed to fetch artists")?;
                rows.iter().map(row_to_artist_mysql).collect()
            }
        }
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let sql = "SELECT COUNT(*) AS count FROM artists WHERE slug = ?";
        let count: i64 = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql).bind(slug).fetch_one(pool).await?.get("count"),
            Backend::Mysql(pool) => sqlx::query(sql).bind(slug).fetch_one(pool).await?.get("count"),
        };
        Ok(count > 0)
    }

    async fn update_profile(&self, artist: &Artist) -> Result<Artist> {
        let ts = now();
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(UPDATE_PROFILE)
                    .bind(&artist.name)
                    .bind(&artist.slug)
                    .bind(&artist.bio)
                    .bind(&artist.avatar_url)
                    .bind(&artist.website)
                    .bind(&artist.contact_email)
                    .bind(artist.primary_medium.to_string())
                    .bind(artist.location.to_string())
                    .bind(ts)
                    .bind(artist.id)
                    .execute(pool)
                    .await
                    .context("Failed to update artist")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(UPDATE_PROFILE)
                    .bind(&artist.name)
                    .bind(&artist.slug)
                    .bind(&artist.bio)
                    .bind(&artist.avatar_url)
                    .bind(&artist.website)
                    .bind(&artist.contact_email)
                    .bind(artist.primary_medium.to_string())
                    .bind(artist.location.to_string())
                    .bind(ts)
                    .bind(artist.id)
                    .execute(pool)
                    .await
                    .context("Failed to update artist")?;
            }
        }

        self.get_by_id(artist.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Artist not found after update"))
    }

    async fn set_status(&self, id: i64, status: ArtistStatus) -> Result<bool> {
        let sql = "UPDATE artists SET status = ?, updated_at = ? WHERE id = ?";
        let ts = now();
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(status.to_string())
                .bind(ts)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to set artist status")?
                .rows_affected(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(status.to_string())
                .bind(ts)
                .bind(id)
                .execute(pool)
                .await
                .context("Failed to set artist status")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn set_featured(&self, id: i64, featured: bool) -> Result<bool> {
        // Featuring does not count as a profile update for candidate ordering.
        let sql = "UPDATE artists SET featured = ? WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(sql).bind(featured).bind(id).execute(pool).await?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(sql).bind(featured).bind(id).execute(pool).await?;
            }
        }
        // MySQL reports zero affected rows when the value is unchanged.
        Ok(self.get_by_id(id).await?.is_some())
    }

    async fn list(&self, filter: &ArtistFilter, params: &ListParams) -> Result<(Vec<Artist>, i64)> {
        let (clause, args) = filter_clause(filter);
        let select = format!(
            "SELECT {} FROM artists {} ORDER BY featured DESC, follower_count DESC, id ASC LIMIT ? OFFSET ?",
            ARTIST_COLUMNS, clause
        );
        let count = format!("SELECT COUNT(*) AS count FROM artists {}", clause);

        match self.pool.backend() {
            Backend::Sqlite(pool) => list_artists_sqlite(pool, &select, &count, &args, params).await,
            Backend::Mysql(pool) => list_artists_mysql(pool, &select, &count, &args, params).await,
        }
    }

    async fn list_approved_candidates(&self, limit: i64) -> Result<Vec<Artist>> {
        let sql = format!(
            "SELECT {} FROM artists WHERE status = 'approved' ORDER BY updated_at DESC, id ASC LIMIT ?",
            ARTIST_COLUMNS
        );
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                let rows = sqlx::query(&sql).bind(limit).fetch_all(pool).await?;
                rows.iter().map(row_to_artist_sqlite).collect()
            }
            Backend::Mysql(pool) => {
                let rows = sqlx::query(&sql).bind(limit).fetch_all(pool).await?;
                rows.iter().map(row_to_artist_mysql).collect()
            }
        }
    }

    async fn adjust_follow_counts(&self, follower_id: i64, followed_id: i64, delta: i64) -> Result<()> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(ADJUST_FOLLOWERS)
                    .bind(delta)
                    .bind(delta)
                    .bind(followed_id)
                    .execute(pool)
                    .await
                    .context("Failed to update follower count")?;
                sqlx::query(ADJUST_FOLLOWING)
                    .bind(delta)
                    .bind(delta)
                    .bind(follower_id)
                    .execute(pool)
                    .await
                    .context("Failed to update following count")?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(ADJUST_FOLLOWERS)
                    .bind(delta)
                    .bind(delta)
                    .bind(followed_id)
                    .execute(pool)
                    .await
                    .context("Failed to update follower count")?;
                sqlx::query(ADJUST_FOLLOWING)
                    .bind(delta)
                    .bind(delta)
                    .bind(follower_id)
                    .execute(pool)
                    .await
                    .context("Failed to update following count")?;
            }
        }
        Ok(())
    }

    async fn count_by_status(&self) -> Result<Vec<(ArtistStatus, i64)>> {
        let sql = "SELECT status, COUNT(*) AS count FROM artists GROUP BY status";
        let pairs: Vec<(String, i64)> = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .fetch_all(pool)
                .await?
                .iter()
                .map(|row| (row.get("status"), row.get("count")))
                .collect(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .fetch_all(pool)
                .await?
                .iter()
                .map(|row| (row.get("status"), row.get("count")))
                .collect(),
        };

        Ok(ArtistStatus::ALL
            .into_iter()
            .map(|status| {
                let count = pairs
                    .iter()
                    .find(|(s, _)| s == status.as_str())
                    .map(|(_, c)| *c)
                    .unwrap_or(0);
                (status, count)
            })
            .collect())
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_insert_sqlite<'q>(
    query: SqliteQuery<'q>,
    artist: &'q Artist,
    ts: chrono::DateTime<chrono::Utc>,
) -> SqliteQuery<'q> {
    query
        .bind(artist.user_id)
        .bind(&artist.name)
        .bind(&artist.slug)
        .bind(&artist.bio)
        .bind(&artist.avatar_url)
        .bind(&artist.website)
        .bind(&artist.contact_email)
        .bind(artist.primary_medium.to_string())
        .bind(artist.location.to_string())
        .bind(artist.status.to_string())
        .bind(artist.featured)
        .bind(ts)
        .bind(ts)
}

async fn list_artists_sqlite(
    pool: &SqlitePool,
    select: &str,
    count: &str,
    args: &[String],
    params: &ListParams,
) -> Result<(Vec<Artist>, i64)> {
    let mut query = sqlx::query(select);
    for arg in args {
        query = query.bind(arg);
    }
    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list artists")?;

    let mut count_query = sqlx::query(count);
    for arg in args {
        count_query = count_query.bind(arg);
    }
    let total: i64 = count_query.fetch_one(pool).await?.get("count");

    let artists = rows.iter().map(row_to_artist_sqlite).collect::<Result<Vec<_>>>()?;
    Ok((artists, total))
}

fn row_to_artist_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Artist> {
    let status: String = row.get("status");
    let medium: String = row.get("primary_medium");
    let location: String = row.get("location");

    Ok(Artist {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        slug: row.get("slug"),
        bio: row.get("bio"),
        avatar_url: row.get("avatar_url"),
        website: row.get("website"),
        contact_email: row.get("contact_email"),
        primary_medium: Medium::from_str(&medium)?,
        location: Location::from_str(&location)?,
        status: ArtistStatus::from_str(&status)?,
        featured: row.get("featured"),
        follower_count: row.get("follower_count"),
        following_count: row.get("following_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

type MySqlQuery<'q> = sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>;

fn bind_insert_mysql<'q>(
    query: MySqlQuery<'q>,
    artist: &'q Artist,
    ts: chrono::DateTime<chrono::Utc>,
) -> MySqlQuery<'q> {
    query
        .bind(artist.user_id)
        .bind(&artist.name)
        .bind(&artist.slug)
        .bind(&artist.bio)
        .bind(&artist.avatar_url)
        .bind(&artist.website)
        .bind(&artist.contact_email)
        .bind(artist.primary_medium.to_string())
        .bind(artist.location.to_string())
        .bind(artist.status.to_string())
        .bind(artist.featured)
        .bind(ts)
        .bind(ts)
}

async fn list_artists_mysql(
    pool: &MySqlPool,
    select: &str,
    count: &str,
    args: &[String],
    params: &ListParams,
) -> Result<(Vec<Artist>, i64)> {
    let mut query = sqlx::query(select);
    for arg in args {
        query = query.bind(arg);
    }
    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list artists")?;

    let mut count_query = sqlx::query(count);
    for arg in args {
        count_query = count_query.bind(arg);
    }
    let total: i64 = count_query.fetch_one(pool).await?.get("count");

    let artists = rows.iter().map(row_to_artist_mysql).collect::<Result<Vec<_>>>()?;
    Ok((artists, total))
}

fn row_to_artist_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Artist> {
    let status: String = row.get("status");
    let medium: String = row.get("primary_medium");
    let location: String = row.get("location");

    Ok(Artist {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        slug: row.get("slug"),
        bio: row.get("bio"),
        avatar_url: row.get("avatar_url"),
        website: row.get("website"),
        contact_email: row.get("contact_email"),
        primary_medium: Medium::from_str(&medium)?,
        location: Location::from_str(&location)?,
        status: ArtistStatus::from_str(&status)?,
        featured: row.get("featured"),
        follower_count: row.get("follower_count"),
        following_count: row.get("following_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
