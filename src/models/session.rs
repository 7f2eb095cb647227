//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a login session stays valid
pub const SESSION_TTL_DAYS: i64 = 7;

/// Opaque login session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session token
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Build a fresh session for `user_id` starting at `now`
    pub fn issue(id: String, user_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            expires_at: now + Duration::days(SESSION_TTL_DAYS),
            created_at: now,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_expires_after_seven_days() {
        let now = Utc::now();
        let session = Session::issue("tok".into(), 1, now);
        assert_eq!(session.expires_at - session.created_at, Duration::days(7));
        assert!(!session.is_expired());
    }

    #[test]
    fn test_is_expired() {
        let session = Session::issue("tok".into(), 1, Utc::now() - Duration::days(8));
        assert!(session.is_expired());
    }
}
