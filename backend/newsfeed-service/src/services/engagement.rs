use super::cache_aside::load_value;
use crate::app::Repositories;
use crate::cache::Caches;
use crate::domain::models::{Post, PostView};
use crate::error::ServiceResult;
use futures::future::try_join_all;

/// Attaches likes and comments to posts at response-building time.
///
/// The attachments live under their own preview keys, never alongside the
/// post itself and never in the paged listings that callers size freely.
#[derive(Clone)]
pub(crate) struct Engagement {
    repos: Repositories,
    caches: Caches,
    limit: u32,
}

impl Engagement {
    pub(crate) fn new(repos: Repositories, caches: Caches, limit: u32) -> Self {
        Self {
            repos,
            caches,
            limit,
        }
    }

    pub(crate) async fn attach(&self, post: Post) -> ServiceResult<PostView> {
        let post_id = post.id;

        let comments = load_value(&self.caches.comment_previews, &post_id, || {
            self.repos.comments.get_by_post(post_id, self.limit, 0)
        })
        .await?;

        let likes = load_value(&self.caches.like_previews, &post_id, || {
            self.repos.likes.get_by_post(post_id, self.limit, 0)
        })
        .await?;

        Ok(PostView {
            post,
            likes,
            comments,
        })
    }

    /// Attach engagement to every post, preserving order
    pub(crate) async fn attach_all(&self, posts: Vec<Post>) -> ServiceResult<Vec<PostView>> {
        try_join_all(posts.into_iter().map(|post| self.attach(post))).await
    }
}
