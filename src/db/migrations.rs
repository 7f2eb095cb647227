//! Database migrations module
//!
//! Code-based migrations for the Penang Artists platform. Every migration is
//! embedded in the binary as SQL strings, with one variant for SQLite and one
//! for MySQL.
//!
//! # Usage
//!
//! ```ignore
//! use penang_artists::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```
//!
//! Timestamps are always bound from Rust so that both backends store the same
//! representation and range comparisons on `created_at` behave identically.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};

use super::{Backend, DynDatabasePool};
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// All migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users_and_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                display_name VARCHAR(100) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'member',
                status VARCHAR(20) NOT NULL DEFAULT 'active',
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                display_name VARCHAR(100) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                role VARCHAR(20) NOT NULL DEFAULT 'member',
                status VARCHAR(20) NOT NULL DEFAULT 'active',
                created_at DATETIME(6) NOT NULL,
                updated_at DATETIME(6) NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id BIGINT NOT NULL,
                expires_at DATETIME(6) NOT NULL,
                created_at DATETIME(6) NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 2,
        name: "create_artists",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS artists (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE,
                name VARCHAR(100) NOT NULL,
                slug VARCHAR(120) NOT NULL UNIQUE,
                bio TEXT NOT NULL DEFAULT '',
                avatar_url VARCHAR(500),
                website VARCHAR(500),
                contact_email VARCHAR(255),
                primary_medium VARCHAR(30) NOT NULL,
                location VARCHAR(30) NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                featured INTEGER NOT NULL DEFAULT 0,
                follower_count INTEGER NOT NULL DEFAULT 0,
                following_count INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_artists_status ON artists(status);
            CREATE INDEX IF NOT EXISTS idx_artists_updated_at ON artists(updated_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS artists (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL UNIQUE,
                name VARCHAR(100) NOT NULL,
                slug VARCHAR(120) NOT NULL UNIQUE,
                bio TEXT NOT NULL,
                avatar_url VARCHAR(500),
                website VARCHAR(500),
                contact_email VARCHAR(255),
                primary_medium VARCHAR(30) NOT NULL,
                location VARCHAR(30) NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'draft',
                featured BOOLEAN NOT NULL DEFAULT FALSE,
                follower_count BIGINT NOT NULL DEFAULT 0,
                following_count BIGINT NOT NULL DEFAULT 0,
                created_at DATETIME(6) NOT NULL,
                updated_at DATETIME(6) NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_artists_status ON artists(status);
            CREATE INDEX idx_artists_updated_at ON artists(updated_at);
        "#,
    },
    Migration {
        version: 3,
        name: "create_portfolio_items",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS portfolio_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                artist_id INTEGER NOT NULL,
                title VARCHAR(200) NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                image_url VARCHAR(500) NOT NULL,
                medium VARCHAR(30) NOT NULL,
                year INTEGER,
                like_count INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL,
                FOREIGN KEY (artist_id) REFERENCES artists(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_portfolio_items_artist_id ON portfolio_items(artist_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS portfolio_items (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                artist_id BIGINT NOT NULL,
                title VARCHAR(200) NOT NULL,
                description TEXT NOT NULL,
                image_url VARCHAR(500) NOT NULL,
                medium VARCHAR(30) NOT NULL,
                year INT,
                like_count BIGINT NOT NULL DEFAULT 0,
                created_at DATETIME(6) NOT NULL,
                updated_at DATETIME(6) NOT NULL,
                FOREIGN KEY (artist_id) REFERENCES artists(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_portfolio_items_artist_id ON portfolio_items(artist_id);
        "#,
    },
    Migration {
        version: 4,
        name: "create_follows_and_likes",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS follows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                follower_id INTEGER NOT NULL,
                followed_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL,
                UNIQUE (follower_id, followed_id),
                FOREIGN KEY (follower_id) REFERENCES artists(id) ON DELETE CASCADE,
                FOREIGN KEY (followed_id) REFERENCES artists(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_follows_followed ON follows(followed_id, created_at);
            CREATE TABLE IF NOT EXISTS likes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                artist_id INTEGER NOT NULL,
                item_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL,
                UNIQUE (artist_id, item_id),
                FOREIGN KEY (artist_id) REFERENCES artists(id) ON DELETE CASCADE,
                FOREIGN KEY (item_id) REFERENCES portfolio_items(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_likes_item ON likes(item_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS follows (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                follower_id BIGINT NOT NULL,
                followed_id BIGINT NOT NULL,
                created_at DATETIME(6) NOT NULL,
                UNIQUE KEY uq_follows_pair (follower_id, followed_id),
                FOREIGN KEY (follower_id) REFERENCES artists(id) ON DELETE CASCADE,
                FOREIGN KEY (followed_id) REFERENCES artists(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_follows_followed ON follows(followed_id, created_at);
            CREATE TABLE IF NOT EXISTS likes (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                artist_id BIGINT NOT NULL,
                item_id BIGINT NOT NULL,
                created_at DATETIME(6) NOT NULL,
                UNIQUE KEY uq_likes_pair (artist_id, item_id),
                FOREIGN KEY (artist_id) REFERENCES artists(id) ON DELETE CASCADE,
                FOREIGN KEY (item_id) REFERENCES portfolio_items(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_likes_item ON likes(item_id);
        "#,
    },
    Migration {
        version: 5,
        name: "create_notifications_and_activities",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recipient_id INTEGER NOT NULL,
                actor_id INTEGER,
                kind VARCHAR(20) NOT NULL,
                payload TEXT NOT NULL DEFAULT '{}',
                is_read INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL,
                FOREIGN KEY (recipient_id) REFERENCES artists(id) ON DELETE CASCADE,
                FOREIGN KEY (actor_id) REFERENCES artists(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient_id, created_at);
            CREATE TABLE IF NOT EXISTS activities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                artist_id INTEGER NOT NULL,
                kind VARCHAR(30) NOT NULL,
                portfolio_item_id INTEGER,
                payload TEXT NOT NULL DEFAULT '{}',
                created_at TIMESTAMP NOT NULL,
                FOREIGN KEY (artist_id) REFERENCES artists(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_activities_artist ON activities(artist_id, created_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                recipient_id BIGINT NOT NULL,
                actor_id BIGINT,
                kind VARCHAR(20) NOT NULL,
                payload TEXT NOT NULL,
                is_read BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME(6) NOT NULL,
                FOREIGN KEY (recipient_id) REFERENCES artists(id) ON DELETE CASCADE,
                FOREIGN KEY (actor_id) REFERENCES artists(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_notifications_recipient ON notifications(recipient_id, created_at);
            CREATE TABLE IF NOT EXISTS activities (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                artist_id BIGINT NOT NULL,
                kind VARCHAR(30) NOT NULL,
                portfolio_item_id BIGINT,
                payload TEXT NOT NULL,
                created_at DATETIME(6) NOT NULL,
                FOREIGN KEY (artist_id) REFERENCES artists(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_activities_artist ON activities(artist_id, created_at);
        "#,
    },
    Migration {
        version: 6,
        name: "create_events_services_inquiries",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                artist_id INTEGER NOT NULL,
                title VARCHAR(200) NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                venue VARCHAR(200) NOT NULL,
                starts_at TIMESTAMP NOT NULL,
                ends_at TIMESTAMP,
                ticket_price_cents INTEGER,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL,
                FOREIGN KEY (artist_id) REFERENCES artists(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_events_artist ON events(artist_id);
            CREATE INDEX IF NOT EXISTS idx_events_starts_at ON events(starts_at);
            CREATE TABLE IF NOT EXISTS services (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                artist_id INTEGER NOT NULL,
                title VARCHAR(200) NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                price_cents INTEGER,
                price_unit VARCHAR(20) NOT NULL DEFAULT 'on_request',
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL,
                FOREIGN KEY (artist_id) REFERENCES artists(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_services_artist ON services(artist_id);
            CREATE TABLE IF NOT EXISTS inquiries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                service_id INTEGER NOT NULL,
                artist_id INTEGER NOT NULL,
                name VARCHAR(100) NOT NULL,
                email VARCHAR(255) NOT NULL,
                message TEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'new',
                created_at TIMESTAMP NOT NULL,
                FOREIGN KEY (service_id) REFERENCES services(id) ON DELETE CASCADE,
                FOREIGN KEY (artist_id) REFERENCES artists(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_inquiries_artist ON inquiries(artist_id, created_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS events (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                artist_id BIGINT NOT NULL,
                title VARCHAR(200) NOT NULL,
                description TEXT NOT NULL,
                venue VARCHAR(200) NOT NULL,
                starts_at DATETIME(6) NOT NULL,
                ends_at DATETIME(6),
                ticket_price_cents BIGINT,
                created_at DATETIME(6) NOT NULL,
                updated_at DATETIME(6) NOT NULL,
                FOREIGN KEY (artist_id) REFERENCES artists(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_events_artist ON events(artist_id);
            CREATE INDEX idx_events_starts_at ON events(starts_at);
            CREATE TABLE IF NOT EXISTS services (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                artist_id BIGINT NOT NULL,
                title VARCHAR(200) NOT NULL,
                description TEXT NOT NULL,
                price_cents BIGINT,
                price_unit VARCHAR(20) NOT NULL DEFAULT 'on_request',
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME(6) NOT NULL,
                updated_at DATETIME(6) NOT NULL,
                FOREIGN KEY (artist_id) REFERENCES artists(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_services_artist ON services(artist_id);
            CREATE TABLE IF NOT EXISTS inquiries (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                service_id BIGINT NOT NULL,
                artist_id BIGINT NOT NULL,
                name VARCHAR(100) NOT NULL,
                email VARCHAR(255) NOT NULL,
                message TEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'new',
                created_at DATETIME(6) NOT NULL,
                FOREIGN KEY (service_id) REFERENCES services(id) ON DELETE CASCADE,
                FOREIGN KEY (artist_id) REFERENCES artists(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_inquiries_artist ON inquiries(artist_id, created_at);
        "#,
    },
    Migration {
        version: 7,
        name: "create_platform_settings",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS platform_settings (
                key VARCHAR(100) PRIMARY KEY,
                value TEXT NOT NULL
            );
            INSERT OR IGNORE INTO platform_settings (key, value) VALUES ('site_name', 'Penang Artists');
            INSERT OR IGNORE INTO platform_settings (key, value) VALUES ('site_description', 'Discover the artists of Penang');
            INSERT OR IGNORE INTO platform_settings (key, value) VALUES ('registration_open', 'true');
            INSERT OR IGNORE INTO platform_settings (key, value) VALUES ('auto_submit_profiles', 'false');
            INSERT OR IGNORE INTO platform_settings (key, value) VALUES ('feed_page_size', '20');
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS platform_settings (
                `key` VARCHAR(100) PRIMARY KEY,
                value TEXT NOT NULL
            );
            INSERT IGNORE INTO platform_settings (`key`, value) VALUES ('site_name', 'Penang Artists');
            INSERT IGNORE INTO platform_settings (`key`, value) VALUES ('site_description', 'Discover the artists of Penang');
            INSERT IGNORE INTO platform_settings (`key`, value) VALUES ('registration_open', 'true');
            INSERT IGNORE INTO platform_settings (`key`, value) VALUES ('auto_submit_profiles', 'false');
            INSERT IGNORE INTO platform_settings (`key`, value) VALUES ('feed_page_size', '20');
        "#,
    },
];

/// Run all pending migrations
///
/// Creates the `_migrations` tracking table if needed, then applies every
/// migration whose version is not yet recorded.
///
/// # Returns
///
/// Number of migrations applied
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_versions(pool).await?;

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at DATETIME(6) NOT NULL
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

/// Versions already recorded in `_migrations`
async fn get_applied_versions(pool: &DynDatabasePool) -> Result<Vec<i32>> {
    match pool.backend() {
        Backend::Sqlite(p) => get_applied_versions_sqlite(p).await,
        Backend::Mysql(p) => get_applied_versions_mysql(p).await,
    }
}

async fn get_applied_versions_sqlite(pool: &SqlitePool) -> Result<Vec<i32>> {
    let rows = sqlx::query("SELECT version FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(|row| row.get("version")).collect())
}

async fn get_applied_versions_mysql(pool: &MySqlPool) -> Result<Vec<i32>> {
    let rows = sqlx::query("SELECT version FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(|row| row.get("version")).collect())
}

/// Apply a single migration
async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.backend() {
        Backend::Sqlite(p) => apply_migration_sqlite(p, migration).await,
        Backend::Mysql(p) => apply_migration_mysql(p, migration).await,
    }
}

async fn apply_migration_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_sqlite) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name, applied_at) VALUES (?, ?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .bind(Utc::now())
        .execute(pool)
        .await?;

    Ok(())
}

async fn apply_migration_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in split_sql_statements(migration.up_mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name, applied_at) VALUES (?, ?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .bind(Utc::now())
        .execute(pool)
        .await?;

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, skipping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Get pending migrations count
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_versions(pool).await?;
    Ok(MIGRATIONS
        .iter()
        .filter(|m| !applied.contains(&m.version))
        .count())
}

/// Get the total number of migrations defined
pub fn total_migrations() -> usize {
    MIGRATIONS.len()
}

/// Get migration by version
pub fn get_migration(version: i32) -> Option<&'static Migration> {
    MIGRATIONS.iter().find(|m| m.version == version)
}
