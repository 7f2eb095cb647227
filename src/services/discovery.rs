//! Discovery service: trending and similar artists
//!
//! Loads the bounded candidate set and recent follow counts, then hands
//! ranking to [`crate::services::scoring`]. Trending lists are cached per
//! limit until moderation changes invalidate them.

use anyhow::Context;
use chrono::Duration as ChronoDuration;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheLayer, SharedCache};
use crate::db::now;
use crate::db::repositories::{ArtistRepository, FollowRepository};
use crate::models::Artist;
use crate::services::artist::ArtistServiceError;
use crate::services::scoring::{
    clamp_limit, rank_similar, rank_trending, SimilarArtist, TrendingArtist, CANDIDATE_LIMIT, SIMILAR_DEFAULT_LIMIT,
    SIMILAR_MAX_LIMIT, TRENDING_DEFAULT_LIMIT, TRENDING_MAX_LIMIT, TRENDING_WINDOW_DAYS,
};

const TRENDING_CACHE_TTL: Duration = Duration::from_secs(300);

/// Matches every cached trending list
pub const TRENDING_CACHE_PATTERN: &str = "artists:trending:*";

fn trending_cache_key(limit: usize) -> String {
    format!("artists:trending:{}", limit)
}

pub struct DiscoveryService {
    artist_repo: Arc<dyn ArtistRepository>,
    follow_repo: Arc<dyn FollowRepository>,
    cache: SharedCache,
}

impl DiscoveryService {
    pub fn new(
        artist_repo: Arc<dyn ArtistRepository>,
        follow_repo: Arc<dyn FollowRepository>,
        cache: SharedCache,
    ) -> Self {
        Self {
            artist_repo,
            follow_repo,
            cache,
        }
    }

    pub async fn trending(&self, limit: Option<usize>) -> Result<Vec<TrendingArtist>, ArtistServiceError> {
        let limit = clamp_limit(limit, TRENDING_DEFAULT_LIMIT, TRENDING_MAX_LIMIT);
        let key = trending_cache_key(limit);

        if let Ok(Some(cached)) = self.cache.get::<Vec<TrendingArtist>>(&key).await {
            return Ok(cached);
        }

        let candidates = self
            .artist_repo
            .list_approved_candidates(CANDIDATE_LIMIT)
            .await
            .context("Failed to load trending candidates")?;
        let since = now() - ChronoDuration::days(TRENDING_WINDOW_DAYS);
        let recent: HashMap<i64, i64> = self
            .follow_repo
            .recent_counts(since)
            .await
            .context("Failed to count recent follows")?
            .into_iter()
            .collect();

        let ranked = rank_trending(&candidates, &recent, limit);
        if let Err(e) = self.cache.set(&key, &ranked, TRENDING_CACHE_TTL).await {
            tracing::warn!("Failed to cache trending artists: {}", e);
        }
        Ok(ranked)
    }

    pub async fn similar(&self, target: &Artist, limit: Option<usize>) -> Result<Vec<SimilarArtist>, ArtistServiceError> {
        let limit = clamp_limit(limit, SIMILAR_DEFAULT_LIMIT, SIMILAR_MAX_LIMIT);
        // One extra so the target itself does not shrink the pool
        let candidates = self
            .artist_repo
            .list_approved_candidates(CANDIDATE_LIMIT + 1)
            .await
            .context("Failed to load similar candidates")?;
        Ok(rank_similar(target, &candidates, limit))
    }

}

pub(crate) async fn invalidate_trending(cache: &SharedCache) {
    if let Err(e) = cache.delete_pattern(TRENDING_CACHE_PATTERN).await {
        tracing::warn!("Failed to invalidate trending cache: {}", e);
    }
}
