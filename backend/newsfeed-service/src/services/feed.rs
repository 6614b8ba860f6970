//! Fan-out-on-read newsfeed
//!
//! A feed page is computed from the reader's own posts plus the posts of
//! everyone they follow, then cached as post summaries under
//! `user:{id}:newsfeed:page:{n}` with the short TTL. No write path touches
//! those pages: new posts and follow changes show up once the page expires.
//! Likes and comments are attached after the cache lookup, so a cached page
//! never carries engagement.

use super::cache_aside::{load_value, page_offset, with_deadline};
use super::Engagement;
use crate::app::Repositories;
use crate::cache::Caches;
use crate::config::ServiceConfig;
use crate::domain::models::{Post, PostView};
use crate::error::ServiceResult;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

#[derive(Clone)]
pub struct FeedService {
    repos: Repositories,
    caches: Caches,
    engagement: Engagement,
    config: ServiceConfig,
}

impl FeedService {
    pub fn new(repos: Repositories, caches: Caches, config: ServiceConfig) -> Self {
        let engagement = Engagement::new(repos.clone(), caches.clone(), config.attachment_limit);
        Self {
            repos,
            caches,
            engagement,
            config,
        }
    }

    /// Page `page` (1-based) of `user_id`'s newsfeed, newest first.
    ///
    /// `page_size` falls back to the configured default. The cache key does
    /// not include the page size, so callers should keep it stable.
    pub async fn get_feed(
        &self,
        user_id: u64,
        page: u32,
        page_size: Option<u32>,
    ) -> ServiceResult<Vec<PostView>> {
        with_deadline("get_feed", self.config.context_timeout(), async move {
            let page_size = page_size.unwrap_or(self.config.feed_page_size);
            let offset = page_offset(page, page_size)?;
            let key = (user_id, page);

            let posts = match self.caches.newsfeed.read(&key).await {
                Some(posts) => posts,
                None => {
                    let authors = self.feed_authors(user_id).await?;
                    // Enough rows to cover every page up to this one
                    let needed = offset + u64::from(page_size);
                    let candidates = self.repos.posts.get_by_authors(&authors, needed).await?;

                    let posts = merge_feed(candidates, offset, page_size);
                    debug!(
                        user_id,
                        page,
                        authors = authors.len(),
                        posts = posts.len(),
                        "Newsfeed page computed"
                    );
                    self.caches.newsfeed.write(&key, &posts).await;
                    posts
                }
            };

            self.engagement.attach_all(posts).await
        })
        .await
    }

    /// The reader plus everyone they follow, without duplicates
    async fn feed_authors(&self, user_id: u64) -> ServiceResult<Vec<u64>> {
        let following = load_value(&self.caches.following, &user_id, || {
            self.repos.users.get_following(user_id)
        })
        .await?;

        let authors: BTreeSet<u64> = following
            .iter()
            .map(|user| user.id)
            .chain(std::iter::once(user_id))
            .collect();
        Ok(authors.into_iter().collect())
    }
}

/// Deduplicate by post id, order by `created_at` then id (both descending)
/// and cut one page starting at `offset`.
pub fn merge_feed(candidates: Vec<Post>, offset: u64, limit: u32) -> Vec<Post> {
    let mut seen = HashSet::with_capacity(candidates.len());
    let mut posts: Vec<Post> = candidates
        .into_iter()
        .filter(|post| seen.insert(post.id))
        .collect();

    posts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });

    posts
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(limit as usize)
        .collect()
}
