//! Services layer - Business logic
//!
//! This module contains the business logic of the Penang Artists platform.
//! Services are responsible for:
//! - Implementing business rules (ownership, visibility, moderation)
//! - Coordinating between repositories and cache
//! - Handling validation and error cases

pub mod artist;
pub mod content;
pub mod discovery;
pub mod event;
pub mod feed;
pub mod inquiry;
pub mod listing;
pub mod moderation;
pub mod notification;
pub mod password;
pub mod portfolio;
pub mod rate_limiter;
pub mod scoring;
pub mod settings;
pub mod social;
pub mod stats;
pub mod user;
pub mod validation;

pub use artist::{taxonomy, ArtistService, ArtistServiceError, Taxonomy};
pub use content::ContentServiceError;
pub use discovery::DiscoveryService;
pub use event::EventService;
pub use feed::FeedService;
pub use inquiry::InquiryService;
pub use listing::ListingService;
pub use moderation::{BulkAction, BulkRequest, BulkResult, ModerationService};
pub use notification::NotificationService;
pub use password::{hash_password, verify_password};
pub use portfolio::PortfolioService;
pub use rate_limiter::{RateLimiters, SlidingWindowLimiter};
pub use settings::{PlatformSettings, PublicSettings, SettingsService, SettingsServiceError, UpdateSettingsInput};
pub use social::{SocialService, SocialServiceError};
pub use stats::{PlatformCounts, StatsService};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
pub use validation::FieldErrors;
