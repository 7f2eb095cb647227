//! Service listings offered by artists (commissions, workshops, tours)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a listing's price is quoted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceUnit {
    Fixed,
    Hourly,
    PerPiece,
    #[default]
    OnRequest,
}

impl fmt::Display for PriceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceUnit::Fixed => write!(f, "fixed"),
            PriceUnit::Hourly => write!(f, "hourly"),
            PriceUnit::PerPiece => write!(f, "per_piece"),
            PriceUnit::OnRequest => write!(f, "on_request"),
        }
    }
}

impl FromStr for PriceUnit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(PriceUnit::Fixed),
            "hourly" => Ok(PriceUnit::Hourly),
            "per_piece" => Ok(PriceUnit::PerPiece),
            "on_request" => Ok(PriceUnit::OnRequest),
            _ => Err(anyhow::anyhow!("Invalid price unit: {}", s)),
        }
    }
}

/// A service an artist offers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceListing {
    pub id: i64,
    pub artist_id: i64,
    pub title: String,
    pub description: String,
    pub price_cents: Option<i64>,
    pub price_unit: PriceUnit,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or replacing a service listing
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceListingInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub price_unit: PriceUnit,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}
