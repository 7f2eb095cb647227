//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for a specific entity.

pub mod activity;
pub mod artist;
pub mod event;
pub mod follow;
pub mod inquiry;
pub mod like;
pub mod listing;
pub mod notification;
pub mod portfolio;
pub mod session;
pub mod settings;
pub mod user;

pub use activity::{ActivityRepository, SqlxActivityRepository};
pub use artist::{ArtistRepository, SqlxArtistRepository};
pub use event::{EventRepository, SqlxEventRepository};
pub use follow::{FollowRepository, SqlxFollowRepository};
pub use inquiry::{InquiryRepository, SqlxInquiryRepository};
pub use like::{LikeRepository, SqlxLikeRepository};
pub use listing::{ListingRepository, SqlxListingRepository};
pub use notification::{NotificationRepository, SqlxNotificationRepository};
pub use portfolio::{PortfolioRepository, SqlxPortfolioRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use settings::{Setting, SettingsRepository, SqlxSettingsRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// `?, ?, ?` for an `IN (...)` list of `n` values
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
