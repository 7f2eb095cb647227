//! Cache layer
//!
//! In-process cache for hot read paths (trending artists, public settings).
//! Values are stored serialized so any `Serialize` type can be cached.
//!
//! ```rust,ignore
//! use penang_artists::cache::{create_cache, CacheLayer};
//!
//! let cache = create_cache(&config.cache);
//! cache.set("artists:trending:6", &results, Duration::from_secs(300)).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache operations
///
/// Generic methods make this trait unusable as `dyn CacheLayer`; share a
/// concrete cache through [`SharedCache`] instead.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Store a value that expires after `ttl`
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every key matching a glob pattern (`*` and `?`)
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;
}

pub type SharedCache = Arc<MemoryCache>;

/// Build the cache described by `config`
pub fn create_cache(config: &CacheConfig) -> SharedCache {
    Arc::new(MemoryCache::with_capacity_and_ttl(
        config.max_capacity,
        Duration::from_secs(config.ttl_seconds),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_cache_from_config() {
        let config = CacheConfig {
            ttl_seconds: 1800,
            max_capacity: 100,
        };
        let cache = create_cache(&config);
        assert_eq!(cache.max_ttl(), Duration::from_secs(1800));

        cache.set("key", &"value".to_string(), Duration::from_secs(60)).await.unwrap();
        let result: Option<String> = cache.get("key").await.unwrap();
        assert_eq!(result, Some("value".to_string()));
    }
}
