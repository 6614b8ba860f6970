//! System-of-record access
//!
//! Each entity has an object-safe repository trait; the PostgreSQL
//! implementations live next to it. Services only see `Arc<dyn Trait>`.

pub mod comments;
pub mod likes;
pub mod posts;
pub mod users;

pub use comments::PgCommentRepository;
pub use likes::PgLikeRepository;
pub use posts::PgPostRepository;
pub use users::PgUserRepository;

use crate::domain::models::{
    Comment, Like, NewComment, NewPost, NewUser, Post, PostUpdate, User,
};
use anyhow::Result;

#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; the store assigns id and timestamps
    async fn create(&self, user: &NewUser) -> Result<User>;

    async fn get_by_id(&self, id: u64) -> Result<Option<User>>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Persist every mutable field of `user`
    async fn update(&self, user: &User) -> Result<User>;

    /// Returns false when no row existed
    async fn delete(&self, id: u64) -> Result<bool>;

    /// Create the edge; an existing edge is left untouched
    async fn follow(&self, follower_id: u64, following_id: u64) -> Result<()>;

    async fn unfollow(&self, follower_id: u64, following_id: u64) -> Result<()>;

    /// Users following `user_id`
    async fn get_followers(&self, user_id: u64) -> Result<Vec<User>>;

    /// Users `user_id` follows
    async fn get_following(&self, user_id: u64) -> Result<Vec<User>>;
}

#[async_trait::async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: &NewPost) -> Result<Post>;

    async fn get_by_id(&self, id: u64) -> Result<Option<Post>>;

    /// Posts authored by `user_id`, newest first
    async fn get_by_user(&self, user_id: u64, limit: u32, offset: u64) -> Result<Vec<Post>>;

    /// Ids of every post authored by `user_id`
    async fn get_ids_by_user(&self, user_id: u64) -> Result<Vec<u64>>;

    /// The newest `limit` posts written by any of `author_ids`, ordered by
    /// `created_at` then `id`, both descending
    async fn get_by_authors(&self, author_ids: &[u64], limit: u64) -> Result<Vec<Post>>;

    /// Returns the updated row, `None` if the post does not exist
    async fn update(&self, update: &PostUpdate) -> Result<Option<Post>>;

    /// Delete the post together with its likes and comments in one
    /// transaction. Returns false when the post did not exist.
    async fn delete_cascade(&self, id: u64) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: &NewComment) -> Result<Comment>;

    async fn get_by_id(&self, id: u64) -> Result<Option<Comment>>;

    /// Comments on `post_id`, newest first
    async fn get_by_post(&self, post_id: u64, limit: u32, offset: u64) -> Result<Vec<Comment>>;

    /// Ids of every comment on `post_id`
    async fn get_ids_by_post(&self, post_id: u64) -> Result<Vec<u64>>;

    /// `(comment id, post id)` of every comment written by `user_id`
    async fn get_refs_by_user(&self, user_id: u64) -> Result<Vec<(u64, u64)>>;

    async fn update(&self, id: u64, content: &str) -> Result<Option<Comment>>;

    async fn delete(&self, id: u64) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait LikeRepository: Send + Sync {
    /// Insert the pair. `None` when the pair already exists.
    async fn create(&self, post_id: u64, user_id: u64) -> Result<Option<Like>>;

    /// Returns false when the pair did not exist
    async fn delete(&self, post_id: u64, user_id: u64) -> Result<bool>;

    async fn exists(&self, post_id: u64, user_id: u64) -> Result<bool>;

    /// Likes on `post_id`, newest first
    async fn get_by_post(&self, post_id: u64, limit: u32, offset: u64) -> Result<Vec<Like>>;

    /// Posts `user_id` has liked
    async fn get_post_ids_by_user(&self, user_id: u64) -> Result<Vec<u64>>;

    async fn count_by_post(&self, post_id: u64) -> Result<u64>;
}

/// Ids are BIGSERIAL in the store and never negative
pub(crate) fn to_db_id(id: u64) -> i64 {
    id as i64
}

pub(crate) fn from_db_id(id: i64) -> u64 {
    id as u64
}
