//! Sliding-window rate limiting
//!
//! Every limiter keeps the timestamps of recent hits per key and refuses a
//! key once `limit` hits fall inside the trailing window. Three limiters are
//! used: failed logins per email, social actions per artist, and inquiries
//! per client IP.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::config::RateLimitConfig;

pub struct SlidingWindowLimiter {
    limit: usize,
    window: Duration,
    hits: RwLock<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl SlidingWindowLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            hits: RwLock::new(HashMap::new()),
        }
    }

    /// True once `key` has used up its allowance in the current window
    pub async fn is_limited(&self, key: &str) -> bool {
        let mut hits = self.hits.write().await;
        let cutoff = Utc::now() - self.window;
        match hits.get_mut(key) {
            Some(times) => {
                times.retain(|t| *t > cutoff);
                times.len() >= self.limit
            }
            None => false,
        }
    }

    pub async fn record(&self, key: &str) {
        let mut hits = self.hits.write().await;
        hits.entry(key.to_string()).or_default().push(Utc::now());
    }

    /// Record a hit unless the key is already limited; returns whether the hit was allowed
    pub async fn try_acquire(&self, key: &str) -> bool {
        let mut hits = self.hits.write().await;
        let now = Utc::now();
        let cutoff = now - self.window;
        let times = hits.entry(key.to_string()).or_default();
        times.retain(|t| *t > cutoff);
        if times.len() >= self.limit {
            return false;
        }
        times.push(now);
        true
    }

    pub async fn reset(&self, key: &str) {
        self.hits.write().await.remove(key);
    }

    /// Drop expired hits and keys with nothing left
    pub async fn prune(&self) {
        let cutoff = Utc::now() - self.window;
        let mut hits = self.hits.write().await;
        hits.retain(|_, times| {
            times.retain(|t| *t > cutoff);
            !times.is_empty()
        });
    }

    pub async fn tracked_keys(&self) -> usize {
        self.hits.read().await.len()
    }
}

/// The limiters shared across services
pub struct RateLimiters {
    pub login: SlidingWindowLimiter,
    pub social: SlidingWindowLimiter,
    pub inquiry: SlidingWindowLimiter,
}

impl RateLimiters {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            login: SlidingWindowLimiter::new(
                config.login_attempts,
                Duration::seconds(config.login_window_secs as i64),
            ),
            social: SlidingWindowLimiter::new(config.social_per_minute, Duration::minutes(1)),
            inquiry: SlidingWindowLimiter::new(
                config.inquiries,
                Duration::seconds(config.inquiry_window_secs as i64),
            ),
        }
    }

    pub async fn prune(&self) {
        self.login.prune().await;
        self.social.prune().await;
        self.inquiry.prune().await;
    }
}

impl Default for RateLimiters {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}
