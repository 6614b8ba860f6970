use super::cache_aside::{load_entity, load_value, page_offset, with_deadline};
use super::{invalidate_post_comments, require_post, require_user};
use crate::app::Repositories;
use crate::cache::Caches;
use crate::config::ServiceConfig;
use crate::domain::models::{Comment, NewComment};
use crate::error::{ServiceError, ServiceResult};
use tracing::debug;

#[derive(Clone)]
pub struct CommentService {
    repos: Repositories,
    caches: Caches,
    config: ServiceConfig,
}

impl CommentService {
    pub fn new(repos: Repositories, caches: Caches, config: ServiceConfig) -> Self {
        Self {
            repos,
            caches,
            config,
        }
    }

    pub async fn create_comment(&self, new_comment: NewComment) -> ServiceResult<Comment> {
        with_deadline("create_comment", self.config.context_timeout(), async move {
            validate_content(&new_comment.content)?;
            require_user(&self.repos, &self.caches, new_comment.user_id).await?;
            require_post(&self.repos, &self.caches, new_comment.post_id).await?;

            let comment = self.repos.comments.create(&new_comment).await?;
            invalidate_post_comments(&self.caches, comment.post_id).await;

            debug!(comment_id = comment.id, post_id = comment.post_id, "Comment created");
            Ok::<_, ServiceError>(comment)
        })
        .await
    }

    pub async fn get_comment(&self, id: u64) -> ServiceResult<Comment> {
        with_deadline("get_comment", self.config.context_timeout(), async move {
            load_entity(&self.caches.comments, &id, || self.repos.comments.get_by_id(id))
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("comment {}", id)))
        })
        .await
    }

    /// Comments on a post, newest first
    pub async fn get_post_comments(
        &self,
        post_id: u64,
        page: u32,
        limit: u32,
    ) -> ServiceResult<Vec<Comment>> {
        with_deadline("get_post_comments", self.config.context_timeout(), async move {
            let offset = page_offset(page, limit)?;
            load_value(&self.caches.post_comments, &(post_id, page), || {
                self.repos.comments.get_by_post(post_id, limit, offset)
            })
            .await
        })
        .await
    }

    /// Only the author may edit a comment
    pub async fn update_comment(
        &self,
        acting_user: u64,
        id: u64,
        content: String,
    ) -> ServiceResult<Comment> {
        with_deadline("update_comment", self.config.context_timeout(), async move {
            validate_content(&content)?;
            self.authored_comment(acting_user, id).await?;

            let comment = self
                .repos
                .comments
                .update(id, &content)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("comment {}", id)))?;
            self.invalidate_comment(&comment).await;

            debug!(comment_id = id, "Comment updated");
            Ok::<_, ServiceError>(comment)
        })
        .await
    }

    /// Only the author may delete a comment
    pub async fn delete_comment(&self, acting_user: u64, id: u64) -> ServiceResult<()> {
        with_deadline("delete_comment", self.config.context_timeout(), async move {
            let comment = self.authored_comment(acting_user, id).await?;

            if !self.repos.comments.delete(id).await? {
                return Err(ServiceError::NotFound(format!("comment {}", id)));
            }
            self.invalidate_comment(&comment).await;

            debug!(comment_id = id, "Comment deleted");
            Ok(())
        })
        .await
    }

    async fn authored_comment(&self, acting_user: u64, id: u64) -> ServiceResult<Comment> {
        let comment = self
            .repos
            .comments
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("comment {}", id)))?;

        if comment.user_id != acting_user {
            return Err(ServiceError::Forbidden(format!(
                "comment {} belongs to another user",
                id
            )));
        }
        Ok(comment)
    }

    async fn invalidate_comment(&self, comment: &Comment) {
        self.caches.comments.invalidate(&comment.id).await;
        invalidate_post_comments(&self.caches, comment.post_id).await;
    }
}

fn validate_content(content: &str) -> ServiceResult<()> {
    if content.trim().is_empty() {
        return Err(ServiceError::InvalidInput("comment content is required".into()));
    }
    Ok(())
}
