//! Platform counts for the admin dashboard

use anyhow::Context;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::db::repositories::{
    ArtistRepository, EventRepository, FollowRepository, LikeRepository, PortfolioRepository,
};
use crate::models::ArtistStatus;

#[derive(Debug, Clone, Serialize)]
pub struct PlatformCounts {
    /// Artists per status; every status is present
    pub artists: BTreeMap<&'static str, i64>,
    pub follows: i64,
    pub likes: i64,
    pub portfolio_items: i64,
    pub events: i64,
}

pub struct StatsService {
    artist_repo: Arc<dyn ArtistRepository>,
    follow_repo: Arc<dyn FollowRepository>,
    like_repo: Arc<dyn LikeRepository>,
    portfolio_repo: Arc<dyn PortfolioRepository>,
    event_repo: Arc<dyn EventRepository>,
}

impl StatsService {
    pub fn new(
        artist_repo: Arc<dyn ArtistRepository>,
        follow_repo: Arc<dyn FollowRepository>,
        like_repo: Arc<dyn LikeRepository>,
        portfolio_repo: Arc<dyn PortfolioRepository>,
        event_repo: Arc<dyn EventRepository>,
    ) -> Self {
        Self {
            artist_repo,
            follow_repo,
            like_repo,
            portfolio_repo,
            event_repo,
        }
    }

    pub async fn counts(&self) -> anyhow::Result<PlatformCounts> {
        let mut artists: BTreeMap<&'static str, i64> =
            ArtistStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
        for (status, count) in self
            .artist_repo
            .count_by_status()
            .await
            .context("Failed to count artists")?
        {
            artists.insert(status.as_str(), count);
        }

        Ok(PlatformCounts {
            artists,
            follows: self.follow_repo.count().await.context("Failed to count follows")?,
            likes: self.like_repo.count().await.context("Failed to count likes")?,
            portfolio_items: self
                .portfolio_repo
                .count()
                .await
                .context("Failed to count portfolio items")?,
            events: self.event_repo.count().await.context("Failed to count events")?,
        })
    }
}
