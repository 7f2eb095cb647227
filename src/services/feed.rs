//! Activity feed
//!
//! Reverse-chronological activities of the artists the requester follows,
//! paged with a `(created_at, id)` cursor. Portfolio activities carry the item's
//! current like count and whether the requester liked it.

use anyhow::Context;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::db::repositories::{ActivityRepository, ArtistRepository, FollowRepository, LikeRepository, PortfolioRepository};
use crate::models::{ActivityKind, ActorSummary, Artist, FeedCursor, FeedItem, FeedPage};
use crate::services::settings::{SettingsService, MAX_FEED_PAGE_SIZE};
use crate::services::social::SocialServiceError;

pub struct FeedService {
    follow_repo: Arc<dyn FollowRepository>,
    activity_repo: Arc<dyn ActivityRepository>,
    artist_repo: Arc<dyn ArtistRepository>,
    portfolio_repo: Arc<dyn PortfolioRepository>,
    like_repo: Arc<dyn LikeRepository>,
    settings: Arc<SettingsService>,
}

impl FeedService {
    pub fn new(
        follow_repo: Arc<dyn FollowRepository>,
        activity_repo: Arc<dyn ActivityRepository>,
        artist_repo: Arc<dyn ArtistRepository>,
        portfolio_repo: Arc<dyn PortfolioRepository>,
        like_repo: Arc<dyn LikeRepository>,
        settings: Arc<SettingsService>,
    ) -> Self {
        Self {
            follow_repo,
            activity_repo,
            artist_repo,
            portfolio_repo,
            like_repo,
            settings,
        }
    }

    /// One page of `requester`'s feed
    ///
    /// `cursor` is the `next_cursor` of the previous page; only activities
    /// ordered after it are returned.
    pub async fn feed(
        &self,
        requester: &Artist,
        cursor: Option<&str>,
        limit: Option<i64>,
    ) -> Result<FeedPage, SocialServiceError> {
        let before = cursor.map(parse_cursor).transpose()?;
        let limit = match limit {
            Some(limit) => limit.clamp(1, MAX_FEED_PAGE_SIZE),
            None => self.settings.feed_page_size().await?,
        };

        let following = self
            .follow_repo
            .following_ids(requester.id)
            .await
            .context("Failed to load following set")?;
        if following.is_empty() {
            return Ok(FeedPage::empty());
        }

        // Authors suspended after being followed drop out of the feed
        let authors: HashMap<i64, Artist> = self
            .artist_repo
            .get_many(&following)
            .await
            .context("Failed to load followed artists")?
            .into_iter()
            .filter(Artist::is_approved)
            .map(|a| (a.id, a))
            .collect();
        if authors.is_empty() {
            return Ok(FeedPage::empty());
        }
        let author_ids: Vec<i64> = authors.keys().copied().collect();

        let mut activities = self
            .activity_repo
            .list_for_authors(&author_ids, before, limit + 1)
            .await
            .context("Failed to load activities")?;
        let has_more = activities.len() as i64 > limit;
        activities.truncate(limit as usize);

        let item_ids: Vec<i64> = activities
            .iter()
            .filter(|a| a.kind == ActivityKind::PortfolioAdded)
            .filter_map(|a| a.portfolio_item_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let like_counts: HashMap<i64, i64> = self
            .portfolio_repo
            .get_many(&item_ids)
            .await
            .context("Failed to load portfolio items")?
            .into_iter()
            .map(|item| (item.id, item.like_count))
            .collect();
        let liked: HashSet<i64> = self
            .like_repo
            .liked_item_ids(requester.id, &item_ids)
            .await
            .context("Failed to load likes")?
            .into_iter()
            .collect();

        let next_cursor = if has_more {
            activities.last().map(|a| FeedCursor::after(a).to_string())
        } else {
            None
        };

        let items = activities
            .into_iter()
            .map(|activity| {
                let item_id = activity
                    .portfolio_item_id
                    .filter(|_| activity.kind == ActivityKind::PortfolioAdded);
                FeedItem {
                    author: authors.get(&activity.artist_id).map(|a| ActorSummary {
                        id: a.id,
                        name: a.name.clone(),
                        slug: a.slug.clone(),
                        avatar_url: a.display_avatar(),
                    }),
                    like_count: item_id.map(|id| like_counts.get(&id).copied().unwrap_or(0)),
                    liked: item_id.is_some_and(|id| liked.contains(&id)),
                    activity,
                }
            })
            .collect();

        Ok(FeedPage {
            items,
            next_cursor,
            has_more,
        })
    }
}

fn parse_cursor(cursor: &str) -> Result<FeedCursor, SocialServiceError> {
    cursor
        .parse()
        .map_err(|_| SocialServiceError::BadRequest(format!("Invalid cursor: {}", cursor)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::test_support::{migrated_pool, seed_artist};
    use crate::db::repositories::{
        SqlxActivityRepository, SqlxArtistRepository, SqlxFollowRepository, SqlxLikeRepository,
        SqlxPortfolioRepository, SqlxSettingsRepository,
    };
    use crate::db::DynDatabasePool;
    use crate::models::{ArtistStatus, Location, Medium, NewActivity, PortfolioItemInput};
    use serde_json::json;

    struct Fixture {
        pool: DynDatabasePool,
        feed: FeedService,
    }

    async fn fixture() -> Fixture {
        let pool = migrated_pool().await;
        let settings = Arc::new(SettingsService::new(
            SqlxSettingsRepository::boxed(pool.clone()),
            Arc::new(MemoryCache::new()),
        ));
        let feed = FeedService::new(
            SqlxFollowRepository::boxed(pool.clone()),
            SqlxActivityRepository::boxed(pool.clone()),
            SqlxArtistRepository::boxed(pool.clone()),
            SqlxPortfolioRepository::boxed(pool.clone()),
            SqlxLikeRepository::boxed(pool.clone()),
            settings,
        );
        Fixture { pool, feed }
    }

    async fn approved(pool: &DynDatabasePool, slug: &str) -> Artist {
        seed_artist(pool, slug, Medium::Painting, Location::GeorgeTown, ArtistStatus::Approved).await
    }

    async fn post(pool: &DynDatabasePool, author: i64, n: usize) {
        let repo = SqlxActivityRepository::new(pool.clone());
        for i in 0..n {
            repo.create(&NewActivity {
                artist_id: author,
                kind: ActivityKind::ProfileUpdated,
                portfolio_item_id: None,
                payload: json!({ "n": i }),
            })
            .await
            .unwrap();
            // Distinct timestamps keep cursor boundaries unambiguous
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
    }

    #[tokio::test]
    async fn test_empty_when_following_nobody() {
        let f = fixture().await;
        let me = approved(&f.pool, "me").await;
        let other = approved(&f.pool, "other").await;
        post(&f.pool, other.id, 3).await;

        let page = f.feed.feed(&me, None, None).await.unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_only_followed_authors_newest_first() {
        let f = fixture().await;
        let me = approved(&f.pool, "me").await;
        let followed = approved(&f.pool, "followed").await;
        let stranger = approved(&f.pool, "stranger").await;
        SqlxFollowRepository::new(f.pool.clone()).insert(me.id, followed.id).await.unwrap();
        post(&f.pool, followed.id, 2).await;
        post(&f.pool, stranger.id, 2).await;

        let page = f.feed.feed(&me, None, None).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.items.iter().all(|i| i.activity.artist_id == followed.id));
        assert!(page.items[0].activity.created_at >= page.items[1].activity.created_at);
        assert_eq!(page.items[0].author.as_ref().unwrap().slug, "followed");
    }

    #[tokio::test]
    async fn test_cursor_pages_are_disjoint_and_exhaustive() {
        let f = fixture().await;
        let me = approved(&f.pool, "me").await;
        let a = approved(&f.pool, "a").await;
        let b = approved(&f.pool, "b").await;
        let follows = SqlxFollowRepository::new(f.pool.clone());
        follows.insert(me.id, a.id).await.unwrap();
        follows.insert(me.id, b.id).await.unwrap();
        post(&f.pool, a.id, 3).await;
        post(&f.pool, b.id, 4).await;

        let mut seen = HashSet::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = f.feed.feed(&me, cursor.as_deref(), Some(3)).await.unwrap();
            assert!(page.items.len() <= 3);
            for item in &page.items {
                assert!(seen.insert(item.activity.id), "activity repeated across pages");
            }
            if !page.has_more {
                assert!(page.next_cursor.is_none());
                break;
            }
            cursor = page.next_cursor;
        }
        assert_eq!(seen.len(), 7);
    }

    #[tokio::test]
    async fn test_portfolio_items_enriched_with_likes() {
        let f = fixture().await;
        let me = approved(&f.pool, "me").await;
        let author = approved(&f.pool, "author").await;
        SqlxFollowRepository::new(f.pool.clone()).insert(me.id, author.id).await.unwrap();

        let portfolio = SqlxPortfolioRepository::new(f.pool.clone());
        let activities = SqlxActivityRepository::new(f.pool.clone());
        let mut item_ids = Vec::new();
        for title in ["Kept", "Deleted"] {
            let item = portfolio
                .create(
                    author.id,
                    &PortfolioItemInput {
                        title: title.to_string(),
                        description: String::new(),
                        image_url: "/uploads/x.png".to_string(),
                        medium: Medium::Painting,
                        year: None,
                    },
                )
                .await
                .unwrap();
            activities
                .create(&NewActivity {
                    artist_id: author.id,
                    kind: ActivityKind::PortfolioAdded,
                    portfolio_item_id: Some(item.id),
                    payload: json!({ "item_id": item.id }),
                })
                .await
                .unwrap();
            item_ids.push(item.id);
        }
        SqlxLikeRepository::new(f.pool.clone()).insert(me.id, item_ids[0]).await.unwrap();
        portfolio.adjust_like_count(item_ids[0], 1).await.unwrap();
        portfolio.delete(item_ids[1]).await.unwrap();

        let page = f.feed.feed(&me, None, None).await.unwrap();
        let kept = page
            .items
            .iter()
            .find(|i| i.activity.portfolio_item_id == Some(item_ids[0]))
            .unwrap();
        assert_eq!(kept.like_count, Some(1));
        assert!(kept.liked);
        let deleted = page
            .items
            .iter()
            .find(|i| i.activity.portfolio_item_id == Some(item_ids[1]))
            .unwrap();
        assert_eq!(deleted.like_count, Some(0));
        assert!(!deleted.liked);
    }

    #[tokio::test]
    async fn test_bad_cursor_rejected() {
        let f = fixture().await;
        let me = approved(&f.pool, "me").await;
        assert!(matches!(
            f.feed.feed(&me, Some("yesterday"), None).await,
            Err(SocialServiceError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_pages_split_activities_with_equal_timestamps() {
        let f = fixture().await;
        let me = approved(&f.pool, "me").await;
        let author = approved(&f.pool, "author").await;
        SqlxFollowRepository::new(f.pool.clone()).insert(me.id, author.id).await.unwrap();

        let repo = SqlxActivityRepository::new(f.pool.clone());
        let mut ids = Vec::new();
        for n in 0..3 {
            let activity = repo
                .create(&NewActivity {
                    artist_id: author.id,
                    kind: ActivityKind::ProfileUpdated,
                    portfolio_item_id: None,
                    payload: json!({ "n": n }),
                })
                .await
                .unwrap();
            ids.push(activity.id);
        }
        let crate::db::Backend::Sqlite(sqlite) = f.pool.backend() else {
            panic!("expected sqlite backend");
        };
        sqlx::query("UPDATE activities SET created_at = (SELECT created_at FROM activities WHERE id = ?)")
            .bind(ids[0])
            .execute(sqlite)
            .await
            .unwrap();

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = f.feed.feed(&me, cursor.as_deref(), Some(1)).await.unwrap();
            seen.extend(page.items.iter().map(|i| i.activity.id));
            if !page.has_more {
                break;
            }
            cursor = page.next_cursor;
        }
        ids.reverse();
        assert_eq!(seen, ids);
    }

    #[tokio::test]
    async fn test_bare_timestamp_cursor_accepted() {
        let f = fixture().await;
        let me = approved(&f.pool, "me").await;
        let author = approved(&f.pool, "author").await;
        SqlxFollowRepository::new(f.pool.clone()).insert(me.id, author.id).await.unwrap();
        post(&f.pool, author.id, 2).await;

        let page = f.feed.feed(&me, Some("2999-01-01T00:00:00Z"), None).await.unwrap();
        assert_eq!(page.items.len(), 2);
    }
}
