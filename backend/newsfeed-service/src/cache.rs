//! Cache families for the newsfeed domain
//!
//! Each marker type binds one key shape and TTL tier to a stored value type;
//! [`Caches`] holds one [`EntityCache`] per family over a shared backend.

use crate::domain::models::{Comment, Like, Post, User};
use feed_cache::{
    CacheFamily, CacheStore, EntityCache, Family, Flag, KeyCodec, PagedFamily, Subresource, Ttl,
};
use std::sync::Arc;

/// `(owner id, page number)`
pub type PageId = (u64, u32);

/// `user:{id}`
pub struct UserEntry;

impl CacheFamily for UserEntry {
    type Id = u64;
    type Value = User;
    const NAME: &'static str = "user";
    const TTL: Ttl = Ttl::Default;

    fn key(id: &u64) -> String {
        KeyCodec::entity(Family::User, *id)
    }
}

/// `post:{id}`
pub struct PostEntry;

impl CacheFamily for PostEntry {
    type Id = u64;
    type Value = Post;
    const NAME: &'static str = "post";
    const TTL: Ttl = Ttl::Default;

    fn key(id: &u64) -> String {
        KeyCodec::entity(Family::Post, *id)
    }
}

/// `comment:{id}`
pub struct CommentEntry;

impl CacheFamily for CommentEntry {
    type Id = u64;
    type Value = Comment;
    const NAME: &'static str = "comment";
    const TTL: Ttl = Ttl::Default;

    fn key(id: &u64) -> String {
        KeyCodec::entity(Family::Comment, *id)
    }
}

/// `user:{id}:followers`
pub struct FollowersOf;

impl CacheFamily for FollowersOf {
    type Id = u64;
    type Value = Vec<User>;
    const NAME: &'static str = "followers";
    const TTL: Ttl = Ttl::Default;

    fn key(id: &u64) -> String {
        KeyCodec::collection(Family::User, *id, Subresource::Followers)
    }
}

/// `user:{id}:following`
pub struct FollowingOf;

impl CacheFamily for FollowingOf {
    type Id = u64;
    type Value = Vec<User>;
    const NAME: &'static str = "following";
    const TTL: Ttl = Ttl::Default;

    fn key(id: &u64) -> String {
        KeyCodec::collection(Family::User, *id, Subresource::Following)
    }
}

/// `user:{id}:posts:page:{n}`
pub struct UserPostsPage;

impl CacheFamily for UserPostsPage {
    type Id = PageId;
    type Value = Vec<Post>;
    const NAME: &'static str = "user_posts";
    const TTL: Ttl = Ttl::Default;

    fn key(id: &PageId) -> String {
        KeyCodec::page(Family::User, id.0, Subresource::Posts, id.1)
    }
}

impl PagedFamily for UserPostsPage {
    type Owner = u64;

    fn pages_pattern(owner: &u64) -> String {
        KeyCodec::pages_pattern(Family::User, *owner, Subresource::Posts)
    }
}

/// `user:{id}:newsfeed:page:{n}`. Post summaries only, never written by a
/// user action and expired by TTL.
pub struct NewsfeedPage;

impl CacheFamily for NewsfeedPage {
    type Id = PageId;
    type Value = Vec<Post>;
    const NAME: &'static str = "newsfeed";
    const TTL: Ttl = Ttl::Short;

    fn key(id: &PageId) -> String {
        KeyCodec::page(Family::User, id.0, Subresource::Newsfeed, id.1)
    }
}

/// `post:{id}:comments:page:{n}`
pub struct PostCommentsPage;

impl CacheFamily for PostCommentsPage {
    type Id = PageId;
    type Value = Vec<Comment>;
    const NAME: &'static str = "post_comments";
    const TTL: Ttl = Ttl::Default;

    fn key(id: &PageId) -> String {
        KeyCodec::page(Family::Post, id.0, Subresource::Comments, id.1)
    }
}

impl PagedFamily for PostCommentsPage {
    type Owner = u64;

    fn pages_pattern(owner: &u64) -> String {
        KeyCodec::pages_pattern(Family::Post, *owner, Subresource::Comments)
    }
}

/// `post:{id}:likes:page:{n}`
pub struct PostLikesPage;

impl CacheFamily for PostLikesPage {
    type Id = PageId;
    type Value = Vec<Like>;
    const NAME: &'static str = "post_likes";
    const TTL: Ttl = Ttl::Default;

    fn key(id: &PageId) -> String {
        KeyCodec::page(Family::Post, id.0, Subresource::Likes, id.1)
    }
}

impl PagedFamily for PostLikesPage {
    type Owner = u64;

    fn pages_pattern(owner: &u64) -> String {
        KeyCodec::pages_pattern(Family::Post, *owner, Subresource::Likes)
    }
}

/// `post:{id}:comments_preview`. The comments attached to a rendered post,
/// kept apart from the paged listing so the two never share a limit.
pub struct PostCommentsPreview;

impl CacheFamily for PostCommentsPreview {
    type Id = u64;
    type Value = Vec<Comment>;
    const NAME: &'static str = "post_comments_preview";
    const TTL: Ttl = Ttl::Default;

    fn key(id: &u64) -> String {
        KeyCodec::collection(Family::Post, *id, Subresource::CommentsPreview)
    }
}

/// `post:{id}:likes_preview`
pub struct PostLikesPreview;

impl CacheFamily for PostLikesPreview {
    type Id = u64;
    type Value = Vec<Like>;
    const NAME: &'static str = "post_likes_preview";
    const TTL: Ttl = Ttl::Default;

    fn key(id: &u64) -> String {
        KeyCodec::collection(Family::Post, *id, Subresource::LikesPreview)
    }
}

/// `post:{post}:like:{user}`. Advisory; a miss always re-checks the store.
pub struct LikeFlag;

impl CacheFamily for LikeFlag {
    /// `(post id, user id)`
    type Id = (u64, u64);
    type Value = bool;
    const NAME: &'static str = "like_flag";
    const TTL: Ttl = Ttl::Long;

    fn key(id: &(u64, u64)) -> String {
        KeyCodec::flag(Family::Post, id.0, Flag::Like, id.1)
    }
}

/// One typed cache per family, all over the same backend
#[derive(Clone)]
pub struct Caches {
    pub users: EntityCache<UserEntry>,
    pub posts: EntityCache<PostEntry>,
    pub comments: EntityCache<CommentEntry>,
    pub followers: EntityCache<FollowersOf>,
    pub following: EntityCache<FollowingOf>,
    pub user_posts: EntityCache<UserPostsPage>,
    pub newsfeed: EntityCache<NewsfeedPage>,
    pub post_comments: EntityCache<PostCommentsPage>,
    pub post_likes: EntityCache<PostLikesPage>,
    pub comment_previews: EntityCache<PostCommentsPreview>,
    pub like_previews: EntityCache<PostLikesPreview>,
    pub like_flags: EntityCache<LikeFlag>,
}

impl Caches {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            users: EntityCache::new(Arc::clone(&store)),
            posts: EntityCache::new(Arc::clone(&store)),
            comments: EntityCache::new(Arc::clone(&store)),
            followers: EntityCache::new(Arc::clone(&store)),
            following: EntityCache::new(Arc::clone(&store)),
            user_posts: EntityCache::new(Arc::clone(&store)),
            newsfeed: EntityCache::new(Arc::clone(&store)),
            post_comments: EntityCache::new(Arc::clone(&store)),
            post_likes: EntityCache::new(Arc::clone(&store)),
            comment_previews: EntityCache::new(Arc::clone(&store)),
            like_previews: EntityCache::new(Arc::clone(&store)),
            like_flags: EntityCache::new(store),
        }
    }
}
