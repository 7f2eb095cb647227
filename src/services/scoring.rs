//! Trending and similar-artist ranking
//!
//! Pure score-and-sort over a bounded candidate set. Loading candidates and
//! caching results is the job of [`crate::services::DiscoveryService`].

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;

use crate::models::{Artist, ArtistSummary};

pub const TRENDING_DEFAULT_LIMIT: usize = 6;
pub const TRENDING_MAX_LIMIT: usize = 24;
pub const SIMILAR_DEFAULT_LIMIT: usize = 4;
pub const SIMILAR_MAX_LIMIT: usize = 12;
/// Most recently updated approved artists considered per ranking
pub const CANDIDATE_LIMIT: i64 = 200;
/// Window for counting recent follows
pub const TRENDING_WINDOW_DAYS: i64 = 7;

const SAME_MEDIUM_WEIGHT: i64 = 3;
const SAME_LOCATION_WEIGHT: i64 = 2;
const HAS_FOLLOWERS_WEIGHT: i64 = 1;

/// Which signal produced a trending list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendingBasis {
    RecentFollows,
    FollowerCount,
    Featured,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingArtist {
    pub artist: ArtistSummary,
    pub basis: TrendingBasis,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarArtist {
    pub artist: ArtistSummary,
    pub score: i64,
}

/// Rank trending artists
///
/// Uses recent follow counts when any candidate has one, else all-time
/// follower counts, else the featured flag. Only approved candidates are
/// ranked.
pub fn rank_trending(candidates: &[Artist], recent_follows: &HashMap<i64, i64>, limit: usize) -> Vec<TrendingArtist> {
    let approved: Vec<&Artist> = candidates.iter().filter(|a| a.is_approved()).collect();

    let mut recent: Vec<(&Artist, i64)> = approved
        .iter()
        .filter_map(|a| {
            recent_follows
                .get(&a.id)
                .copied()
                .filter(|count| *count > 0)
                .map(|count| (*a, count))
        })
        .collect();
    if !recent.is_empty() {
        recent.sort_by_key(|(a, count)| (Reverse(*count), Reverse(a.follower_count), a.id));
        return finish(recent, TrendingBasis::RecentFollows, limit);
    }

    let mut followed: Vec<(&Artist, i64)> = approved
        .iter()
        .filter(|a| a.follower_count > 0)
        .map(|a| (*a, a.follower_count))
        .collect();
    if !followed.is_empty() {
        followed.sort_by_key(|(a, count)| (Reverse(*count), a.id));
        return finish(followed, TrendingBasis::FollowerCount, limit);
    }

    let mut featured: Vec<(&Artist, i64)> = approved.iter().filter(|a| a.featured).map(|a| (*a, 1)).collect();
    featured.sort_by_key(|(a, _)| a.id);
    finish(featured, TrendingBasis::Featured, limit)
}

fn finish(ranked: Vec<(&Artist, i64)>, basis: TrendingBasis, limit: usize) -> Vec<TrendingArtist> {
    ranked
        .into_iter()
        .take(limit)
        .map(|(artist, score)| TrendingArtist {
            artist: artist.summary(),
            basis,
            score,
        })
        .collect()
}

/// Weighted similarity of `candidate` to `target`
pub fn similarity_score(target: &Artist, candidate: &Artist) -> i64 {
    let mut score = 0;
    if candidate.primary_medium == target.primary_medium {
        score += SAME_MEDIUM_WEIGHT;
    }
    if candidate.location == target.location {
        score += SAME_LOCATION_WEIGHT;
    }
    if candidate.follower_count > 0 {
        score += HAS_FOLLOWERS_WEIGHT;
    }
    score
}

/// Approved artists most similar to `target`, excluding the target itself
/// and anyone scoring zero
pub fn rank_similar(target: &Artist, candidates: &[Artist], limit: usize) -> Vec<SimilarArtist> {
    let mut scored: Vec<(&Artist, i64)> = candidates
        .iter()
        .filter(|c| c.id != target.id && c.is_approved())
        .map(|c| (c, similarity_score(target, c)))
        .filter(|(_, score)| *score > 0)
        .collect();
    scored.sort_by_key(|(c, score)| (Reverse(*score), Reverse(c.follower_count), c.id));

    scored
        .into_iter()
        .take(limit)
        .map(|(artist, score)| SimilarArtist {
            artist: artist.summary(),
            score,
        })
        .collect()
}

/// Clamp a requested limit into `1..=max`, defaulting when absent
pub fn clamp_limit(requested: Option<usize>, default: usize, max: usize) -> usize {
    requested.unwrap_or(default).clamp(1, max)
}
