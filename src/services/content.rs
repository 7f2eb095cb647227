//! Shared pieces of the artist-owned content services (portfolio, events,
//! service listings and inquiries)

use crate::models::{Artist, User};
use crate::services::artist::can_view;
use crate::services::validation::FieldErrors;

#[derive(Debug, thiserror::Error)]
pub enum ContentServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Too many requests")]
    RateLimited,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// `Forbidden` unless `owner` is the artist with `artist_id`
pub(crate) fn ensure_owner(owner: &Artist, artist_id: i64, what: &str) -> Result<(), ContentServiceError> {
    if owner.id == artist_id {
        Ok(())
    } else {
        Err(ContentServiceError::Forbidden(format!("You can only modify your own {}", what)))
    }
}

/// `NotFound` unless `viewer` may see content belonging to `artist`
pub(crate) fn ensure_visible(
    artist: Option<&Artist>,
    viewer: Option<&User>,
    not_found: impl FnOnce() -> String,
) -> Result<(), ContentServiceError> {
    match artist {
        Some(artist) if can_view(artist, viewer) => Ok(()),
        _ => Err(ContentServiceError::NotFound(not_found())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArtistStatus, Location, Medium, UserRole};
    use chrono::Utc;

    fn artist(id: i64, user_id: i64, status: ArtistStatus) -> Artist {
        Artist {
            id,
            user_id,
            name: "N".to_string(),
            slug: format!("n-{}", id),
            bio: String::new(),
            avatar_url: None,
            website: None,
            contact_email: None,
            primary_medium: Medium::Other,
            location: Location::Other,
            status,
            featured: false,
            follower_count: 0,
            following_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_ownership_and_visibility() {
        let mine = artist(1, 10, ArtistStatus::Draft);
        assert!(ensure_owner(&mine, 1, "items").is_ok());
        assert!(matches!(
            ensure_owner(&mine, 2, "items"),
            Err(ContentServiceError::Forbidden(_))
        ));

        let mut owner = User::new("o@x.io".into(), "o".into(), "h".into(), UserRole::Member);
        owner.id = 10;
        assert!(ensure_visible(Some(&mine), Some(&owner), String::new).is_ok());
        assert!(ensure_visible(Some(&mine), None, String::new).is_err());
        assert!(ensure_visible(None, Some(&owner), String::new).is_err());

        let public = artist(2, 20, ArtistStatus::Approved);
        assert!(ensure_visible(Some(&public), None, String::new).is_ok());
    }
}
