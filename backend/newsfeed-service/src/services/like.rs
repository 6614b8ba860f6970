use super::cache_aside::{load_value, page_offset, with_deadline};
use super::{invalidate_post_likes, require_post, require_user};
use crate::app::Repositories;
use crate::cache::Caches;
use crate::config::ServiceConfig;
use crate::domain::models::Like;
use crate::error::{ServiceError, ServiceResult};
use tracing::debug;

#[derive(Clone)]
pub struct LikeService {
    repos: Repositories,
    caches: Caches,
    config: ServiceConfig,
}

impl LikeService {
    pub fn new(repos: Repositories, caches: Caches, config: ServiceConfig) -> Self {
        Self {
            repos,
            caches,
            config,
        }
    }

    /// Record a like. The store, not the cached flag, decides whether the
    /// pair already exists.
    pub async fn like_post(&self, post_id: u64, user_id: u64) -> ServiceResult<Like> {
        with_deadline("like_post", self.config.context_timeout(), async move {
            require_user(&self.repos, &self.caches, user_id).await?;
            require_post(&self.repos, &self.caches, post_id).await?;

            if self.repos.likes.exists(post_id, user_id).await? {
                return Err(ServiceError::Conflict("post already liked".into()));
            }

            let like = self
                .repos
                .likes
                .create(post_id, user_id)
                .await?
                .ok_or_else(|| ServiceError::Conflict("post already liked".into()))?;
            self.invalidate_like(post_id, user_id).await;

            debug!(post_id, user_id, "Post liked");
            Ok(like)
        })
        .await
    }

    pub async fn unlike_post(&self, post_id: u64, user_id: u64) -> ServiceResult<()> {
        with_deadline("unlike_post", self.config.context_timeout(), async move {
            if !self.repos.likes.delete(post_id, user_id).await? {
                return Err(ServiceError::NotFound(format!(
                    "like on post {} by user {}",
                    post_id, user_id
                )));
            }
            self.invalidate_like(post_id, user_id).await;

            debug!(post_id, user_id, "Post unliked");
            Ok(())
        })
        .await
    }

    /// Likes on a post, newest first
    pub async fn get_post_likes(
        &self,
        post_id: u64,
        page: u32,
        limit: u32,
    ) -> ServiceResult<Vec<Like>> {
        with_deadline("get_post_likes", self.config.context_timeout(), async move {
            let offset = page_offset(page, limit)?;
            load_value(&self.caches.post_likes, &(post_id, page), || {
                self.repos.likes.get_by_post(post_id, limit, offset)
            })
            .await
        })
        .await
    }

    pub async fn has_user_liked(&self, post_id: u64, user_id: u64) -> ServiceResult<bool> {
        with_deadline("has_user_liked", self.config.context_timeout(), async move {
            load_value(&self.caches.like_flags, &(post_id, user_id), || {
                self.repos.likes.exists(post_id, user_id)
            })
            .await
        })
        .await
    }

    /// Like count straight from the store
    pub async fn count_post_likes(&self, post_id: u64) -> ServiceResult<u64> {
        with_deadline("count_post_likes", self.config.context_timeout(), async move {
            self.repos
                .likes
                .count_by_post(post_id)
                .await
                .map_err(ServiceError::from)
        })
        .await
    }

    /// Pages of this post's comments are cleared only by comment writes
    async fn invalidate_like(&self, post_id: u64, user_id: u64) {
        invalidate_post_likes(&self.caches, post_id).await;
        self.caches.like_flags.invalidate(&(post_id, user_id)).await;
    }
}
