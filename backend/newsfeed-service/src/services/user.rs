use super::cache_aside::{load_value, with_deadline};
use super::{forget_post, invalidate_post_comments, invalidate_post_likes, require_user};
use crate::app::Repositories;
use crate::cache::Caches;
use crate::config::ServiceConfig;
use crate::domain::models::{NewUser, User, UserUpdate};
use crate::error::{ServiceError, ServiceResult};
use feed_cache::{Family, KeyCodec};
use tracing::{debug, info};

/// Accounts and the follow graph
#[derive(Clone)]
pub struct UserService {
    repos: Repositories,
    caches: Caches,
    config: ServiceConfig,
}

impl UserService {
    pub fn new(repos: Repositories, caches: Caches, config: ServiceConfig) -> Self {
        Self {
            repos,
            caches,
            config,
        }
    }

    /// Create an account. Username and email must both be unused.
    pub async fn register(&self, new_user: NewUser) -> ServiceResult<User> {
        with_deadline("register", self.config.context_timeout(), async move {
            if new_user.username.trim().is_empty() {
                return Err(ServiceError::InvalidInput("username is required".into()));
            }
            if new_user.email.trim().is_empty() {
                return Err(ServiceError::InvalidInput("email is required".into()));
            }

            if self
                .repos
                .users
                .get_by_username(&new_user.username)
                .await?
                .is_some()
            {
                return Err(ServiceError::Conflict("username already taken".into()));
            }
            if self.repos.users.get_by_email(&new_user.email).await?.is_some() {
                return Err(ServiceError::Conflict("email already registered".into()));
            }

            let user = self.repos.users.create(&new_user).await?;
            self.caches.users.write(&user.id, &user).await;

            info!(user_id = user.id, "User registered");
            Ok(user)
        })
        .await
    }

    pub async fn get_profile(&self, id: u64) -> ServiceResult<User> {
        with_deadline("get_profile", self.config.context_timeout(), async move {
            require_user(&self.repos, &self.caches, id).await
        })
        .await
    }

    /// Only the account owner may update their profile
    pub async fn update_profile(
        &self,
        acting_user: u64,
        update: UserUpdate,
    ) -> ServiceResult<User> {
        with_deadline("update_profile", self.config.context_timeout(), async move {
            let id = update.id;
            if acting_user != id {
                return Err(ServiceError::Forbidden("cannot update another user".into()));
            }

            let mut user = self
                .repos
                .users
                .get_by_id(id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("user {}", id)))?;

            if let Some(email) = &update.email {
                if let Some(other) = self.repos.users.get_by_email(email).await? {
                    if other.id != id {
                        return Err(ServiceError::Conflict("email already registered".into()));
                    }
                }
            }

            update.apply_to(&mut user);
            let updated = self.repos.users.update(&user).await?;
            self.caches.users.invalidate(&id).await;

            debug!(user_id = id, "User profile updated");
            Ok(updated)
        })
        .await
    }

    /// Remove an account and every cached view derived from it
    pub async fn delete_profile(&self, acting_user: u64, id: u64) -> ServiceResult<()> {
        with_deadline("delete_profile", self.config.context_timeout(), async move {
            if acting_user != id {
                return Err(ServiceError::Forbidden("cannot delete another user".into()));
            }

            // Edges, posts, comments and likes disappear with the row, so
            // collect everything their cached views are keyed by first
            let followers = self.repos.users.get_followers(id).await?;
            let following = self.repos.users.get_following(id).await?;
            let mut posts = Vec::new();
            for post_id in self.repos.posts.get_ids_by_user(id).await? {
                let comment_ids = self.repos.comments.get_ids_by_post(post_id).await?;
                posts.push((post_id, comment_ids));
            }
            let authored_comments = self.repos.comments.get_refs_by_user(id).await?;
            let liked_posts = self.repos.likes.get_post_ids_by_user(id).await?;

            if !self.repos.users.delete(id).await? {
                return Err(ServiceError::NotFound(format!("user {}", id)));
            }

            self.caches.users.invalidate(&id).await;
            self.caches
                .users
                .invalidate_pattern(&KeyCodec::derived_pattern(Family::User, id))
                .await;
            for follower in &followers {
                self.caches.following.invalidate(&follower.id).await;
            }
            for followee in &following {
                self.caches.followers.invalidate(&followee.id).await;
            }
            for (post_id, comment_ids) in &posts {
                forget_post(&self.caches, *post_id, comment_ids).await;
            }
            for (comment_id, post_id) in &authored_comments {
                self.caches.comments.invalidate(comment_id).await;
                invalidate_post_comments(&self.caches, *post_id).await;
            }
            for post_id in &liked_posts {
                invalidate_post_likes(&self.caches, *post_id).await;
                self.caches.like_flags.invalidate(&(*post_id, id)).await;
            }

            info!(user_id = id, posts = posts.len(), "User deleted");
            Ok(())
        })
        .await
    }

    pub async fn follow(&self, follower_id: u64, following_id: u64) -> ServiceResult<()> {
        with_deadline("follow", self.config.context_timeout(), async move {
            require_user(&self.repos, &self.caches, following_id).await?;

            self.repos.users.follow(follower_id, following_id).await?;
            self.invalidate_follow_edge(follower_id, following_id).await;

            debug!(follower_id, following_id, "Follow created");
            Ok::<_, ServiceError>(())
        })
        .await
    }

    pub async fn unfollow(&self, follower_id: u64, following_id: u64) -> ServiceResult<()> {
        with_deadline("unfollow", self.config.context_timeout(), async move {
            self.repos.users.unfollow(follower_id, following_id).await?;
            self.invalidate_follow_edge(follower_id, following_id).await;

            debug!(follower_id, following_id, "Follow removed");
            Ok::<_, ServiceError>(())
        })
        .await
    }

    pub async fn get_followers(&self, id: u64) -> ServiceResult<Vec<User>> {
        with_deadline("get_followers", self.config.context_timeout(), async move {
            load_value(&self.caches.followers, &id, || {
                self.repos.users.get_followers(id)
            })
            .await
        })
        .await
    }

    pub async fn get_following(&self, id: u64) -> ServiceResult<Vec<User>> {
        with_deadline("get_following", self.config.context_timeout(), async move {
            load_value(&self.caches.following, &id, || {
                self.repos.users.get_following(id)
            })
            .await
        })
        .await
    }

    /// Newsfeed pages are left to expire on their own TTL
    async fn invalidate_follow_edge(&self, follower_id: u64, following_id: u64) {
        self.caches.users.invalidate(&follower_id).await;
        self.caches.users.invalidate(&following_id).await;
        self.caches.following.invalidate(&follower_id).await;
        self.caches.followers.invalidate(&following_id).await;
    }
}
