//! Activity records and feed pages

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ActorSummary;

/// Kind of artist-authored activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    PortfolioAdded,
    EventCreated,
    ServiceCreated,
    ProfileUpdated,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::PortfolioAdded => "portfolio_added",
            ActivityKind::EventCreated => "event_created",
            ActivityKind::ServiceCreated => "service_created",
            ActivityKind::ProfileUpdated => "profile_updated",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "portfolio_added" => Ok(ActivityKind::PortfolioAdded),
            "event_created" => Ok(ActivityKind::EventCreated),
            "service_created" => Ok(ActivityKind::ServiceCreated),
            "profile_updated" => Ok(ActivityKind::ProfileUpdated),
            _ => Err(anyhow::anyhow!("Invalid activity kind: {}", s)),
        }
    }
}

/// A stored activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    /// Author
    pub artist_id: i64,
    pub kind: ActivityKind,
    pub portfolio_item_id: Option<i64>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Activity to be stored
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub artist_id: i64,
    pub kind: ActivityKind,
    pub portfolio_item_id: Option<i64>,
    pub payload: serde_json::Value,
}

/// An activity enriched for display in the feed
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    #[serde(flatten)]
    pub activity: Activity,
    pub author: Option<ActorSummary>,
    /// Present for portfolio activities only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<i64>,
    pub liked: bool,
}

/// Position in the feed, written as `<rfc3339>_<id>`
///
/// Pages continue with activities strictly older than `created_at`, or as
/// old with a smaller id. A bare RFC 3339 timestamp is accepted and leaves
/// `id` unset, which skips every activity sharing that timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedCursor {
    pub created_at: DateTime<Utc>,
    pub id: Option<i64>,
}

impl FeedCursor {
    pub fn after(activity: &Activity) -> Self {
        Self {
            created_at: activity.created_at,
            id: Some(activity.id),
        }
    }
}

impl fmt::Display for FeedCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ts = self.created_at.to_rfc3339_opts(SecondsFormat::Micros, true);
        match self.id {
            Some(id) => write!(f, "{}_{}", ts, id),
            None => f.write_str(&ts),
        }
    }
}

impl FromStr for FeedCursor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ts, id) = match s.rsplit_once('_') {
            Some((ts, id)) => {
                let id = id
                    .parse::<i64>()
                    .map_err(|_| anyhow::anyhow!("Invalid cursor id: {}", id))?;
                (ts, Some(id))
            }
            None => (s, None),
        };
        let created_at = DateTime::parse_from_rfc3339(ts)
            .map_err(|e| anyhow::anyhow!("Invalid cursor timestamp {}: {}", ts, e))?
            .with_timezone(&Utc);
        Ok(Self { created_at, id })
    }
}

/// One page of the feed
#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    /// Value to pass as `cursor` for the next page
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl FeedPage {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            has_more: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_carries_timestamp_and_id() {
        let cursor: FeedCursor = "2026-03-01T10:00:00.123456Z_42".parse().unwrap();
        assert_eq!(cursor.id, Some(42));
        assert_eq!(cursor.to_string(), "2026-03-01T10:00:00.123456Z_42");
    }

    #[test]
    fn test_bare_timestamp_cursor() {
        let cursor: FeedCursor = "2026-03-01T18:00:00+08:00".parse().unwrap();
        assert_eq!(cursor.id, None);
        assert_eq!(cursor.to_string(), "2026-03-01T10:00:00.000000Z");
    }

    #[test]
    fn test_malformed_cursors() {
        for bad in ["yesterday", "2026-03-01T10:00:00Z_", "2026-03-01T10:00:00Z_x", "_7"] {
            assert!(bad.parse::<FeedCursor>().is_err(), "{} should be rejected", bad);
        }
    }
}
