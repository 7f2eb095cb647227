//! Artist model
//!
//! An artist profile is the public face of a user account. Profiles move
//! through a moderation lifecycle (`draft -> pending -> approved`, with
//! `suspended` as an admin-only side state) and only approved profiles are
//! visible in the directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Artist profile entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    /// Owning user account
    pub user_id: i64,
    pub name: String,
    /// URL slug (unique)
    pub slug: String,
    pub bio: String,
    pub avatar_url: Option<String>,
    pub website: Option<String>,
    pub contact_email: Option<String>,
    pub primary_medium: Medium,
    pub location: Location,
    pub status: ArtistStatus,
    pub featured: bool,
    pub follower_count: i64,
    pub following_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Artist {
    /// Whether the profile is visible to the public
    pub fn is_approved(&self) -> bool {
        self.status == ArtistStatus::Approved
    }

    /// Avatar to display: the uploaded one, else a gravatar of the contact email
    pub fn display_avatar(&self) -> Option<String> {
        self.avatar_url
            .clone()
            .or_else(|| self.contact_email.as_deref().map(gravatar_url))
    }

    /// Compact view embedded in notifications, feed entries and lists
    pub fn summary(&self) -> ArtistSummary {
        ArtistSummary {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            avatar_url: self.display_avatar(),
            primary_medium: self.primary_medium,
            location: self.location,
            follower_count: self.follower_count,
        }
    }
}

/// Gravatar URL for an email address
pub fn gravatar_url(email: &str) -> String {
    let digest = md5::compute(email.trim().to_lowercase().as_bytes());
    format!("https://www.gravatar.com/avatar/{:x}?d=identicon", digest)
}

/// Compact artist representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistSummary {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub avatar_url: Option<String>,
    pub primary_medium: Medium,
    pub location: Location,
    pub follower_count: i64,
}

/// Moderation status of an artist profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtistStatus {
    #[default]
    Draft,
    Pending,
    Approved,
    Suspended,
}

impl ArtistStatus {
    pub const ALL: [ArtistStatus; 4] = [
        ArtistStatus::Draft,
        ArtistStatus::Pending,
        ArtistStatus::Approved,
        ArtistStatus::Suspended,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtistStatus::Draft => "draft",
            ArtistStatus::Pending => "pending",
            ArtistStatus::Approved => "approved",
            ArtistStatus::Suspended => "suspended",
        }
    }
}

impl fmt::Display for ArtistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtistStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == lower)
            .ok_or_else(|| anyhow::anyhow!("Invalid artist status: {}", s))
    }
}

/// Primary artistic medium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Medium {
    Painting,
    Drawing,
    Photography,
    Sculpture,
    Ceramics,
    Textile,
    Printmaking,
    StreetArt,
    Digital,
    Illustration,
    MixedMedia,
    Performance,
    Other,
}

impl Medium {
    pub const ALL: [Medium; 13] = [
        Medium::Painting,
        Medium::Drawing,
        Medium::Photography,
        Medium::Sculpture,
        Medium::Ceramics,
        Medium::Textile,
        Medium::Printmaking,
        Medium::StreetArt,
        Medium::Digital,
        Medium::Illustration,
        Medium::MixedMedia,
        Medium::Performance,
        Medium::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Medium::Painting => "painting",
            Medium::Drawing => "drawing",
            Medium::Photography => "photography",
            Medium::Sculpture => "sculpture",
            Medium::Ceramics => "ceramics",
            Medium::Textile => "textile",
            Medium::Printmaking => "printmaking",
            Medium::StreetArt => "street_art",
            Medium::Digital => "digital",
            Medium::Illustration => "illustration",
            Medium::MixedMedia => "mixed_media",
            Medium::Performance => "performance",
            Medium::Other => "other",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Medium::Painting => "Painting",
            Medium::Drawing => "Drawing",
            Medium::Photography => "Photography",
            Medium::Sculpture => "Sculpture",
            Medium::Ceramics => "Ceramics",
            Medium::Textile => "Textile",
            Medium::Printmaking => "Printmaking",
            Medium::StreetArt => "Street Art",
            Medium::Digital => "Digital",
            Medium::Illustration => "Illustration",
            Medium::MixedMedia => "Mixed Media",
            Medium::Performance => "Performance",
            Medium::Other => "Other",
        }
    }
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Medium {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == lower)
            .ok_or_else(|| anyhow::anyhow!("Invalid medium: {}", s))
    }
}

/// Area of Penang the artist works from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    GeorgeTown,
    AirItam,
    TanjungBungah,
    BatuFerringhi,
    BalikPulau,
    BayanLepas,
    Butterworth,
    BukitMertajam,
    NibongTebal,
    Other,
}

impl Location {
    pub const ALL: [Location; 10] = [
        Location::GeorgeTown,
        Location::AirItam,
        Location::TanjungBungah,
        Location::BatuFerringhi,
        Location::BalikPulau,
        Location::BayanLepas,
        Location::Butterworth,
        Location::BukitMertajam,
        Location::NibongTebal,
        Location::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Location::GeorgeTown => "george_town",
            Location::AirItam => "air_itam",
            Location::TanjungBungah => "tanjung_bungah",
            Location::BatuFerringhi => "batu_ferringhi",
            Location::BalikPulau => "balik_pulau",
            Location::BayanLepas => "bayan_lepas",
            Location::Butterworth => "butterworth",
            Location::BukitMertajam => "bukit_mertajam",
            Location::NibongTebal => "nibong_tebal",
            Location::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Location::GeorgeTown => "George Town",
            Location::AirItam => "Air Itam",
            Location::TanjungBungah => "Tanjung Bungah",
            Location::BatuFerringhi => "Batu Ferringhi",
            Location::BalikPulau => "Balik Pulau",
            Location::BayanLepas => "Bayan Lepas",
            Location::Butterworth => "Butterworth",
            Location::BukitMertajam => "Bukit Mertajam",
            Location::NibongTebal => "Nibong Tebal",
            Location::Other => "Other",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == lower)
            .ok_or_else(|| anyhow::anyhow!("Invalid location: {}", s))
    }
}

/// Input for creating an artist profile
#[derive(Debug, Clone, Deserialize)]
pub struct CreateArtistInput {
    pub name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub website: Option<String>,
    pub contact_email: Option<String>,
    pub primary_medium: Medium,
    pub location: Location,
}

/// Partial update of an artist profile.
///
/// For the optional link fields an empty string clears the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateArtistInput {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub website: Option<String>,
    pub contact_email: Option<String>,
    pub primary_medium: Option<Medium>,
    pub location: Option<Location>,
}

impl UpdateArtistInput {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.bio.is_none()
            && self.avatar_url.is_none()
            && self.website.is_none()
            && self.contact_email.is_none()
            && self.primary_medium.is_none()
            && self.location.is_none()
    }
}

/// Directory filters
#[derive(Debug, Clone, Default)]
pub struct ArtistFilter {
    /// Restrict to this status; `None` means any
    pub status: Option<ArtistStatus>,
    pub medium: Option<Medium>,
    pub location: Option<Location>,
    /// Case-insensitive substring of name or bio
    pub q: Option<String>,
    pub featured_only: bool,
}

impl ArtistFilter {
    /// Filter for the public directory
    pub fn public() -> Self {
        Self {
            status: Some(ArtistStatus::Approved),
            ..Self::default()
        }
    }
}
