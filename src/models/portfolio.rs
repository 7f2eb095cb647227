//! Portfolio item model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Medium;

/// A piece of work shown on an artist's profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioItem {
    pub id: i64,
    pub artist_id: i64,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub medium: Medium,
    /// Year the work was made
    pub year: Option<i32>,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or replacing a portfolio item
#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioItemInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub image_url: String,
    pub medium: Medium,
    pub year: Option<i32>,
}
