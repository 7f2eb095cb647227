//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What triggered a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Follow,
    Like,
    Inquiry,
    Moderation,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Follow => write!(f, "follow"),
            NotificationKind::Like => write!(f, "like"),
            NotificationKind::Inquiry => write!(f, "inquiry"),
            NotificationKind::Moderation => write!(f, "moderation"),
        }
    }
}

impl FromStr for NotificationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "follow" => Ok(NotificationKind::Follow),
            "like" => Ok(NotificationKind::Like),
            "inquiry" => Ok(NotificationKind::Inquiry),
            "moderation" => Ok(NotificationKind::Moderation),
            _ => Err(anyhow::anyhow!("Invalid notification kind: {}", s)),
        }
    }
}

/// Actor details embedded in a notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSummary {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub avatar_url: Option<String>,
}

/// Notification addressed to an artist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: i64,
    /// `None` for system notifications such as moderation decisions
    pub actor_id: Option<i64>,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    /// Filled in when listing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<ActorSummary>,
}

/// Notification to be stored
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: i64,
    pub actor_id: Option<i64>,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display_matches_serde() {
        for kind in [
            NotificationKind::Follow,
            NotificationKind::Like,
            NotificationKind::Inquiry,
            NotificationKind::Moderation,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
            assert_eq!(NotificationKind::from_str(&kind.to_string()).unwrap(), kind);
        }
    }
}
