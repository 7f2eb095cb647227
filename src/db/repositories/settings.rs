//! Platform settings repository
//!
//! Key/value storage backing the admin settings page.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::{Backend, DynDatabasePool};

/// A setting key-value pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Setting>>;

    /// Every stored setting, ordered by key
    async fn get_all(&self) -> Result<Vec<Setting>>;

    /// Values for the given keys; missing keys are absent from the map
    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, String>>;

    /// Insert or overwrite a setting
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn set_many(&self, settings: &HashMap<String, String>) -> Result<()>;
}

pub struct SqlxSettingsRepository {
    pool: DynDatabasePool,
}

impl SqlxSettingsRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SettingsRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SettingsRepository for SqlxSettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<Setting>> {
        let setting = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query("SELECT key, value FROM platform_settings WHERE key = ?")
                .bind(key)
                .fetch_optional(pool)
                .await?
                .map(|r| Setting {
                    key: r.get("key"),
                    value: r.get("value"),
                }),
            Backend::Mysql(pool) => {
                sqlx::query("SELECT `key`, value FROM platform_settings WHERE `key` = ?")
                    .bind(key)
                    .fetch_optional(pool)
                    .await?
                    .map(|r| Setting {
                        key: r.get("key"),
                        value: r.get("value"),
                    })
            }
        };
        Ok(setting)
    }

    async fn get_all(&self) -> Result<Vec<Setting>> {
        let settings = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query("SELECT key, value FROM platform_settings ORDER BY key")
                .fetch_all(pool)
                .await
                .context("Failed to load settings")?
                .into_iter()
                .map(|r| Setting {
                    key: r.get("key"),
                    value: r.get("value"),
                })
                .collect(),
            Backend::Mysql(pool) => {
                sqlx::query("SELECT `key`, value FROM platform_settings ORDER BY `key`")
                    .fetch_all(pool)
                    .await
                    .context("Failed to load settings")?
                    .into_iter()
                    .map(|r| Setting {
                        key: r.get("key"),
                        value: r.get("value"),
                    })
                    .collect()
            }
        };
        Ok(settings)
    }

    async fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, String>> {
        let mut result = HashMap::new();
        for key in keys {
            if let Some(setting) = self.get(key).await? {
                result.insert(setting.key, setting.value);
            }
        }
        Ok(result)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        match self.pool.backend() {
            Backend::Sqlite(pool) => {
                sqlx::query(
                    "INSERT INTO platform_settings (key, value) VALUES (?, ?)
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                )
                .bind(key)
                .bind(value)
                .execute(pool)
                .await
                .with_context(|| format!("Failed to store setting {}", key))?;
            }
            Backend::Mysql(pool) => {
                sqlx::query(
                    "INSERT INTO platform_settings (`key`, value) VALUES (?, ?)
                     ON DUPLICATE KEY UPDATE value = VALUES(value)",
                )
                .bind(key)
                .bind(value)
                .execute(pool)
                .await
                .with_context(|| format!("Failed to store setting {}", key))?;
            }
        }
        Ok(())
    }

    async fn set_many(&self, settings: &HashMap<String, String>) -> Result<()> {
        for (key, value) in settings {
            self.set(key, value).await?;
        }
        Ok(())
    }
}
