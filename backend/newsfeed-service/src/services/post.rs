use super::cache_aside::{load_value, page_offset, with_deadline};
use super::{forget_post, require_post, require_user, Engagement};
use crate::app::Repositories;
use crate::cache::Caches;
use crate::config::ServiceConfig;
use crate::domain::models::{NewPost, Post, PostUpdate, PostView};
use crate::error::{ServiceError, ServiceResult};
use tracing::{debug, info};

#[derive(Clone)]
pub struct PostService {
    repos: Repositories,
    caches: Caches,
    engagement: Engagement,
    config: ServiceConfig,
}

impl PostService {
    pub fn new(repos: Repositories, caches: Caches, config: ServiceConfig) -> Self {
        let engagement = Engagement::new(repos.clone(), caches.clone(), config.attachment_limit);
        Self {
            repos,
            caches,
            engagement,
            config,
        }
    }

    /// Store a new post. Followers' feeds pick it up when their cached
    /// pages expire.
    pub async fn create_post(&self, new_post: NewPost) -> ServiceResult<Post> {
        with_deadline("create_post", self.config.context_timeout(), async move {
            validate_body(&new_post.content, new_post.image_url.as_deref())?;
            require_user(&self.repos, &self.caches, new_post.user_id).await?;

            let post = self.repos.posts.create(&new_post).await?;
            self.invalidate_post(&post).await;

            info!(post_id = post.id, user_id = post.user_id, "Post created");
            Ok::<_, ServiceError>(post)
        })
        .await
    }

    pub async fn get_post(&self, id: u64) -> ServiceResult<Post> {
        with_deadline("get_post", self.config.context_timeout(), async move {
            require_post(&self.repos, &self.caches, id).await
        })
        .await
    }

    /// The post with its first page of likes and comments attached
    pub async fn get_post_detail(&self, id: u64) -> ServiceResult<PostView> {
        with_deadline("get_post_detail", self.config.context_timeout(), async move {
            let post = require_post(&self.repos, &self.caches, id).await?;
            self.engagement.attach(post).await
        })
        .await
    }

    /// Posts authored by `user_id`, newest first
    pub async fn get_user_posts(
        &self,
        user_id: u64,
        page: u32,
        limit: u32,
    ) -> ServiceResult<Vec<Post>> {
        with_deadline("get_user_posts", self.config.context_timeout(), async move {
            let offset = page_offset(page, limit)?;
            load_value(&self.caches.user_posts, &(user_id, page), || {
                self.repos.posts.get_by_user(user_id, limit, offset)
            })
            .await
        })
        .await
    }

    /// Edit content. Only the owner recorded in the store may edit.
    pub async fn update_post(&self, acting_user: u64, update: PostUpdate) -> ServiceResult<Post> {
        with_deadline("update_post", self.config.context_timeout(), async move {
            validate_body(&update.content, update.image_url.as_deref())?;
            self.owned_post(acting_user, update.id).await?;

            let post = self
                .repos
                .posts
                .update(&update)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("post {}", update.id)))?;
            self.invalidate_post(&post).await;

            debug!(post_id = post.id, "Post updated");
            Ok::<_, ServiceError>(post)
        })
        .await
    }

    /// Delete the post with its likes and comments
    pub async fn delete_post(&self, acting_user: u64, id: u64) -> ServiceResult<()> {
        with_deadline("delete_post", self.config.context_timeout(), async move {
            let post = self.owned_post(acting_user, id).await?;
            // Comment rows go with the post, so collect their ids first
            let comment_ids = self.repos.comments.get_ids_by_post(id).await?;

            if !self.repos.posts.delete_cascade(id).await? {
                return Err(ServiceError::NotFound(format!("post {}", id)));
            }

            self.caches.user_posts.invalidate_pages(&post.user_id).await;
            forget_post(&self.caches, id, &comment_ids).await;

            info!(post_id = id, "Post deleted");
            Ok(())
        })
        .await
    }

    /// Load from the store (never the cache) and check ownership
    async fn owned_post(&self, acting_user: u64, id: u64) -> ServiceResult<Post> {
        let post = self
            .repos
            .posts
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("post {}", id)))?;

        if post.user_id != acting_user {
            return Err(ServiceError::Forbidden(format!(
                "post {} belongs to another user",
                id
            )));
        }
        Ok(post)
    }

    async fn invalidate_post(&self, post: &Post) {
        self.caches.posts.invalidate(&post.id).await;
        self.caches.user_posts.invalidate_pages(&post.user_id).await;
    }
}

fn validate_body(content: &str, image_url: Option<&str>) -> ServiceResult<()> {
    if content.trim().is_empty() && image_url.map_or(true, |url| url.trim().is_empty()) {
        return Err(ServiceError::InvalidInput(
            "post needs content or an image".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_body() {
        assert!(validate_body("hello", None).is_ok());
        assert!(validate_body("", Some("https://img/1.png")).is_ok());
        assert!(validate_body("  ", None).is_err());
        assert!(validate_body("", Some(" ")).is_err());
    }
}
