//! Visitor inquiries about service listings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InquiryStatus {
    #[default]
    New,
    Read,
    Archived,
}

impl fmt::Display for InquiryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InquiryStatus::New => write!(f, "new"),
            InquiryStatus::Read => write!(f, "read"),
            InquiryStatus::Archived => write!(f, "archived"),
        }
    }
}

impl FromStr for InquiryStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(InquiryStatus::New),
            "read" => Ok(InquiryStatus::Read),
            "archived" => Ok(InquiryStatus::Archived),
            _ => Err(anyhow::anyhow!("Invalid inquiry status: {}", s)),
        }
    }
}

/// A message left by a visitor on a service listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inquiry {
    pub id: i64,
    pub service_id: i64,
    /// Artist who owns the service
    pub artist_id: i64,
    pub name: String,
    pub email: String,
    pub message: String,
    pub status: InquiryStatus,
    pub created_at: DateTime<Utc>,
}

/// Input submitted by a visitor
#[derive(Debug, Clone, Deserialize)]
pub struct InquiryInput {
    pub name: String,
    pub email: String,
    pub message: String,
}
