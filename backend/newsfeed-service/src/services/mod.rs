//! Usecases over the store and the cache-aside layer
//!
//! Every public operation runs under the configured deadline. Reads go
//! through the family caches; writes hit the store first and then invalidate
//! every cached view they could have staled.

mod cache_aside;
mod comment;
mod engagement;
mod feed;
mod like;
mod post;
mod user;

pub use comment::CommentService;
use engagement::Engagement;
pub use feed::{merge_feed, FeedService};
pub use like::LikeService;
pub use post::PostService;
pub use user::UserService;

use crate::app::Repositories;
use crate::cache::Caches;
use crate::domain::models::{Post, User};
use crate::error::{ServiceError, ServiceResult};
use cache_aside::load_entity;
use feed_cache::{Family, KeyCodec};

pub(crate) async fn require_user(
    repos: &Repositories,
    caches: &Caches,
    id: u64,
) -> ServiceResult<User> {
    load_entity(&caches.users, &id, || repos.users.get_by_id(id))
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user {}", id)))
}

pub(crate) async fn require_post(
    repos: &Repositories,
    caches: &Caches,
    id: u64,
) -> ServiceResult<Post> {
    load_entity(&caches.posts, &id, || repos.posts.get_by_id(id))
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("post {}", id)))
}

/// Drop every cached view of a removed post: the entity, everything under
/// `post:{id}:*` and the entities of the comments it carried.
pub(crate) async fn forget_post(caches: &Caches, post_id: u64, comment_ids: &[u64]) {
    caches.posts.invalidate(&post_id).await;
    caches
        .posts
        .invalidate_pattern(&KeyCodec::derived_pattern(Family::Post, post_id))
        .await;
    for comment_id in comment_ids {
        caches.comments.invalidate(comment_id).await;
    }
}

/// Comment listings and the attached preview of one post
pub(crate) async fn invalidate_post_comments(caches: &Caches, post_id: u64) {
    caches.post_comments.invalidate_pages(&post_id).await;
    caches.comment_previews.invalidate(&post_id).await;
}

/// Like listings and the attached preview of one post
pub(crate) async fn invalidate_post_likes(caches: &Caches, post_id: u64) {
    caches.post_likes.invalidate_pages(&post_id).await;
    caches.like_previews.invalidate(&post_id).await;
}
