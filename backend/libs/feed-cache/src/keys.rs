//! Cache key schema
//!
//! Every cached view is addressed through [`KeyCodec`] so that invalidation
//! patterns always line up with the keys written by readers.
//!
//! Key formats:
//! - entity:     `{family}:{id}`
//! - collection: `{family}:{id}:{subresource}`
//! - page:       `{family}:{id}:{subresource}:page:{page}`
//! - flag:       `{family}:{id}:{flag}:{other_id}`
//!
//! The family token is always the first segment and comes from a closed set,
//! so keys of different families can never collide.

use std::fmt;

/// Entity family, first segment of every key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    User,
    Post,
    Comment,
}

impl Family {
    pub const fn token(self) -> &'static str {
        match self {
            Family::User => "user",
            Family::Post => "post",
            Family::Comment => "comment",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Collection hanging off an entity, e.g. a post's comments or a user's feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subresource {
    /// Posts authored by a user
    Posts,
    /// Personalized feed of a user
    Newsfeed,
    Comments,
    Likes,
    /// First comments attached to a rendered post
    CommentsPreview,
    /// First likes attached to a rendered post
    LikesPreview,
    Followers,
    Following,
}

impl Subresource {
    pub const fn token(self) -> &'static str {
        match self {
            Subresource::Posts => "posts",
            Subresource::Newsfeed => "newsfeed",
            Subresource::Comments => "comments",
            Subresource::Likes => "likes",
            Subresource::CommentsPreview => "comments_preview",
            Subresource::LikesPreview => "likes_preview",
            Subresource::Followers => "followers",
            Subresource::Following => "following",
        }
    }
}

impl fmt::Display for Subresource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Boolean relation between an entity and another id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// "user `other` likes post `id`"
    Like,
}

impl Flag {
    pub const fn token(self) -> &'static str {
        match self {
            Flag::Like => "like",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Cache key builder
pub struct KeyCodec;

impl KeyCodec {
    /// Format: {family}:{id}
    pub fn entity(family: Family, id: u64) -> String {
        format!("{}:{}", family, id)
    }

    /// Format: {family}:{id}:{subresource}
    pub fn collection(family: Family, id: u64, sub: Subresource) -> String {
        format!("{}:{}:{}", family, id, sub)
    }

    /// Format: {family}:{id}:{subresource}:page:{page}
    pub fn page(family: Family, id: u64, sub: Subresource, page: u32) -> String {
        format!("{}:{}:{}:page:{}", family, id, sub, page)
    }

    /// Format: {family}:{id}:{flag}:{other_id}
    pub fn flag(family: Family, id: u64, flag: Flag, other_id: u64) -> String {
        format!("{}:{}:{}:{}", family, id, flag, other_id)
    }

    /// Pattern for every page of one subresource.
    /// Format: {family}:{id}:{subresource}:*
    pub fn pages_pattern(family: Family, id: u64, sub: Subresource) -> String {
        format!("{}:{}:{}:*", family, id, sub)
    }

    /// Pattern for every view derived from an entity (collections, pages, flags),
    /// excluding the entity key itself.
    /// Format: {family}:{id}:*
    pub fn derived_pattern(family: Family, id: u64) -> String {
        format!("{}:{}:*", family, id)
    }

    /// Extract the family token from a key
    pub fn family_of(key: &str) -> Option<&str> {
        key.split(':').next().filter(|token| !token.is_empty())
    }
}
