//! Data models
//!
//! Entities stored by the platform plus the input and view types the service
//! layer exchanges with the API.

mod activity;
mod artist;
mod event;
mod inquiry;
mod listing;
mod notification;
mod pagination;
mod portfolio;
mod session;
mod social;
mod user;

pub use activity::{Activity, ActivityKind, FeedCursor, FeedItem, FeedPage, NewActivity};
pub use artist::{
    gravatar_url, Artist, ArtistFilter, ArtistStatus, ArtistSummary, CreateArtistInput, Location,
    Medium, UpdateArtistInput,
};
pub use event::{Event, EventInput};
pub use inquiry::{Inquiry, InquiryInput, InquiryStatus};
pub use listing::{PriceUnit, ServiceListing, ServiceListingInput};
pub use notification::{ActorSummary, NewNotification, Notification, NotificationKind};
pub use pagination::{ListParams, PagedResult, MAX_PAGE_SIZE};
pub use portfolio::{PortfolioItem, PortfolioItemInput};
pub use session::{Session, SESSION_TTL_DAYS};
pub use social::{Follow, FollowState, Like, LikeState};
pub use user::{User, UserRole, UserStatus};
