//! Database layer
//!
//! Database abstraction for the Penang Artists platform. It supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The driver is selected from configuration. Repositories receive a
//! [`DynDatabasePool`] and dispatch on [`Backend`] to the dialect-specific
//! query functions.
//!
//! # Usage
//!
//! ```ignore
//! use penang_artists::config::DatabaseConfig;
//! use penang_artists::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

use chrono::{DateTime, SubsecRound, Utc};

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, Backend, DatabasePool, DynDatabasePool, MysqlDatabase,
    SqliteDatabase,
};

/// Current time at the precision both backends store (microseconds).
///
/// Rows are written with this value so a timestamp read back from the
/// database compares equal to the one that was written.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
