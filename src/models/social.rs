//! Follow and like edges

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Directed edge: `follower_id` follows `followed_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub id: i64,
    pub follower_id: i64,
    pub followed_id: i64,
    pub created_at: DateTime<Utc>,
}

/// An artist liking a portfolio item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Like {
    pub id: i64,
    pub artist_id: i64,
    pub item_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Follow relationship as seen by the requester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowState {
    pub following: bool,
    /// Current follower count of the target artist
    pub follower_count: i64,
}

/// Like relationship as seen by the requester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    /// Current like count of the item
    pub like_count: i64,
}
