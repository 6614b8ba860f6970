#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use feed_cache::{CacheError, CacheResult, CacheStore, MemoryCacheStore};
use newsfeed_service::config::ServiceConfig;
use newsfeed_service::domain::models::{
    Comment, Like, NewComment, NewPost, NewUser, Post, PostUpdate, User,
};
use newsfeed_service::repository::{
    CommentRepository, LikeRepository, PostRepository, UserRepository,
};
use newsfeed_service::{Repositories, Services};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct State {
    next_id: u64,
    tick: i64,
    fixed_time: Option<DateTime<Utc>>,
    users: Vec<User>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    likes: Vec<Like>,
    /// (follower, following)
    follows: BTreeSet<(u64, u64)>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing timestamps unless pinned
    fn now(&mut self) -> DateTime<Utc> {
        if let Some(fixed) = self.fixed_time {
            return fixed;
        }
        self.tick += 1;
        base_time() + ChronoDuration::seconds(self.tick)
    }

    fn users_by_ids(&self, ids: impl Iterator<Item = u64>) -> Vec<User> {
        ids.filter_map(|id| self.users.iter().find(|u| u.id == id).cloned())
            .collect()
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

/// In-memory system of record that counts every call made to it
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    calls: AtomicUsize,
    latency: Mutex<Option<Duration>>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    /// Every following insert gets this timestamp
    pub fn pin_time(&self, at: DateTime<Utc>) {
        self.state.lock().fixed_time = Some(at);
    }

    pub fn unpin_time(&self) {
        self.state.lock().fixed_time = None;
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    pub fn insert_post_raw(&self, user_id: u64, content: &str) -> Post {
        let mut state = self.state.lock();
        let now = state.now();
        let post = Post {
            id: state.next_id(),
            user_id,
            content: content.to_string(),
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        state.posts.push(post.clone());
        post
    }

    pub fn comment_count(&self, post_id: u64) -> usize {
        self.state
            .lock()
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .count()
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn page<T: Clone>(items: Vec<T>, limit: u32, offset: u64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

#[async_trait::async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: &NewUser) -> Result<User> {
        self.enter().await;
        let mut state = self.state.lock();
        let now = state.now();
        let created = User {
            id: state.next_id(),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            birthday: user.birthday,
            created_at: now,
            updated_at: now,
        };
        state.users.push(created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<User>> {
        self.enter().await;
        Ok(self.state.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        self.enter().await;
        Ok(self
            .state
            .lock()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.enter().await;
        Ok(self
            .state
            .lock()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update(&self, user: &User) -> Result<User> {
        self.enter().await;
        let mut state = self.state.lock();
        let now = state.now();
        let stored = state
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| anyhow::anyhow!("user {} missing", user.id))?;
        *stored = User {
            updated_at: now,
            ..user.clone()
        };
        Ok(stored.clone())
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        self.enter().await;
        let mut state = self.state.lock();
        let before = state.users.len();
        state.users.retain(|u| u.id != id);
        if state.users.len() == before {
            return Ok(false);
        }

        // Same cascade as the schema's ON DELETE CASCADE foreign keys
        let post_ids: Vec<u64> = state
            .posts
            .iter()
            .filter(|p| p.user_id == id)
            .map(|p| p.id)
            .collect();
        state.posts.retain(|p| p.user_id != id);
        state
            .comments
            .retain(|c| c.user_id != id && !post_ids.contains(&c.post_id));
        state
            .likes
            .retain(|l| l.user_id != id && !post_ids.contains(&l.post_id));
        state.follows.retain(|(a, b)| *a != id && *b != id);
        Ok(true)
    }

    async fn follow(&self, follower_id: u64, following_id: u64) -> Result<()> {
        self.enter().await;
        self.state.lock().follows.insert((follower_id, following_id));
        Ok(())
    }

    async fn unfollow(&self, follower_id: u64, following_id: u64) -> Result<()> {
        self.enter().await;
        self.state.lock().follows.remove(&(follower_id, following_id));
        Ok(())
    }

    async fn get_followers(&self, user_id: u64) -> Result<Vec<User>> {
        self.enter().await;
        let state = self.state.lock();
        let ids = state
            .follows
            .iter()
            .filter(|(_, following)| *following == user_id)
            .map(|(follower, _)| *follower);
        Ok(state.users_by_ids(ids))
    }

    async fn get_following(&self, user_id: u64) -> Result<Vec<User>> {
        self.enter().await;
        let state = self.state.lock();
        let ids = state
            .follows
            .iter()
            .filter(|(follower, _)| *follower == user_id)
            .map(|(_, following)| *following);
        Ok(state.users_by_ids(ids))
    }
}

fn newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[async_trait::async_trait]
impl PostRepository for InMemoryStore {
    async fn create(&self, post: &NewPost) -> Result<Post> {
        self.enter().await;
        let mut state = self.state.lock();
        let now = state.now();
        let created = Post {
            id: state.next_id(),
            user_id: post.user_id,
            content: post.content.clone(),
            image_url: post.image_url.clone(),
            created_at: now,
            updated_at: now,
        };
        state.posts.push(created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<Post>> {
        self.enter().await;
        Ok(self.state.lock().posts.iter().find(|p| p.id == id).cloned())
    }

    async fn get_by_user(&self, user_id: u64, limit: u32, offset: u64) -> Result<Vec<Post>> {
        self.enter().await;
        let mut posts: Vec<Post> = self
            .state
            .lock()
            .posts
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut posts);
        Ok(page(posts, limit, offset))
    }

    async fn get_ids_by_user(&self, user_id: u64) -> Result<Vec<u64>> {
        self.enter().await;
        Ok(self
            .state
            .lock()
            .posts
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.id)
            .collect())
    }

    async fn get_by_authors(&self, author_ids: &[u64], limit: u64) -> Result<Vec<Post>> {
        self.enter().await;
        let mut posts: Vec<Post> = self
            .state
            .lock()
            .posts
            .iter()
            .filter(|p| author_ids.contains(&p.user_id))
            .cloned()
            .collect();
        newest_first(&mut posts);
        posts.truncate(limit as usize);
        Ok(posts)
    }

    async fn update(&self, update: &PostUpdate) -> Result<Option<Post>> {
        self.enter().await;
        let mut state = self.state.lock();
        let now = state.now();
        Ok(state.posts.iter_mut().find(|p| p.id == update.id).map(|post| {
            post.content = update.content.clone();
            post.image_url = update.image_url.clone();
            post.updated_at = now;
            post.clone()
        }))
    }

    async fn delete_cascade(&self, id: u64) -> Result<bool> {
        self.enter().await;
        let mut state = self.state.lock();
        state.likes.retain(|l| l.post_id != id);
        state.comments.retain(|c| c.post_id != id);
        let before = state.posts.len();
        state.posts.retain(|p| p.id != id);
        Ok(state.posts.len() < before)
    }
}

#[async_trait::async_trait]
impl CommentRepository for InMemoryStore {
    async fn create(&self, comment: &NewComment) -> Result<Comment> {
        self.enter().await;
        let mut state = self.state.lock();
        let now = state.now();
        let created = Comment {
            id: state.next_id(),
            post_id: comment.post_id,
            user_id: comment.user_id,
            content: comment.content.clone(),
            created_at: now,
            updated_at: now,
        };
        state.comments.push(created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<Comment>> {
        self.enter().await;
        Ok(self
            .state
            .lock()
            .comments
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn get_by_post(&self, post_id: u64, limit: u32, offset: u64) -> Result<Vec<Comment>> {
        self.enter().await;
        let mut comments: Vec<Comment> = self
            .state
            .lock()
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(page(comments, limit, offset))
    }

    async fn get_ids_by_post(&self, post_id: u64) -> Result<Vec<u64>> {
        self.enter().await;
        Ok(self
            .state
            .lock()
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .map(|c| c.id)
            .collect())
    }

    async fn get_refs_by_user(&self, user_id: u64) -> Result<Vec<(u64, u64)>> {
        self.enter().await;
        Ok(self
            .state
            .lock()
            .comments
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| (c.id, c.post_id))
            .collect())
    }

    async fn update(&self, id: u64, content: &str) -> Result<Option<Comment>> {
        self.enter().await;
        let mut state = self.state.lock();
        let now = state.now();
        Ok(state.comments.iter_mut().find(|c| c.id == id).map(|comment| {
            comment.content = content.to_string();
            comment.updated_at = now;
            comment.clone()
        }))
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        self.enter().await;
        let mut state = self.state.lock();
        let before = state.comments.len();
        state.comments.retain(|c| c.id != id);
        Ok(state.comments.len() < before)
    }
}

#[async_trait::async_trait]
impl LikeRepository for InMemoryStore {
    async fn create(&self, post_id: u64, user_id: u64) -> Result<Option<Like>> {
        self.enter().await;
        let mut state = self.state.lock();
        if state
            .likes
            .iter()
            .any(|l| l.post_id == post_id && l.user_id == user_id)
        {
            return Ok(None);
        }
        let now = state.now();
        let like = Like {
            id: state.next_id(),
            post_id,
            user_id,
            created_at: now,
        };
        state.likes.push(like.clone());
        Ok(Some(like))
    }

    async fn delete(&self, post_id: u64, user_id: u64) -> Result<bool> {
        self.enter().await;
        let mut state = self.state.lock();
        let before = state.likes.len();
        state
            .likes
            .retain(|l| !(l.post_id == post_id && l.user_id == user_id));
        Ok(state.likes.len() < before)
    }

    async fn exists(&self, post_id: u64, user_id: u64) -> Result<bool> {
        self.enter().await;
        Ok(self
            .state
            .lock()
            .likes
            .iter()
            .any(|l| l.post_id == post_id && l.user_id == user_id))
    }

    async fn get_by_post(&self, post_id: u64, limit: u32, offset: u64) -> Result<Vec<Like>> {
        self.enter().await;
        let mut likes: Vec<Like> = self
            .state
            .lock()
            .likes
            .iter()
            .filter(|l| l.post_id == post_id)
            .cloned()
            .collect();
        likes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(page(likes, limit, offset))
    }

    async fn get_post_ids_by_user(&self, user_id: u64) -> Result<Vec<u64>> {
        self.enter().await;
        Ok(self
            .state
            .lock()
            .likes
            .iter()
            .filter(|l| l.user_id == user_id)
            .map(|l| l.post_id)
            .collect())
    }

    async fn count_by_post(&self, post_id: u64) -> Result<u64> {
        self.enter().await;
        Ok(self
            .state
            .lock()
            .likes
            .iter()
            .filter(|l| l.post_id == post_id)
            .count() as u64)
    }
}

/// Cache backend that is always down
pub struct FailingCacheStore;

#[async_trait::async_trait]
impl CacheStore for FailingCacheStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn delete_by_prefix(&self, _pattern: &str) -> CacheResult<usize> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
}

pub struct TestContext {
    pub services: Services,
    pub store: Arc<InMemoryStore>,
    pub cache: MemoryCacheStore,
}

pub fn repositories(store: &Arc<InMemoryStore>) -> Repositories {
    Repositories {
        users: store.clone(),
        posts: store.clone(),
        comments: store.clone(),
        likes: store.clone(),
    }
}

pub fn setup() -> TestContext {
    setup_with_config(ServiceConfig::default())
}

pub fn setup_with_config(config: ServiceConfig) -> TestContext {
    let store = InMemoryStore::new();
    let cache = MemoryCacheStore::new();
    let services = Services::new(repositories(&store), Arc::new(cache.clone()), config);
    TestContext {
        services,
        store,
        cache,
    }
}

pub fn setup_without_cache() -> (Services, Arc<InMemoryStore>) {
    let store = InMemoryStore::new();
    let services = Services::new(
        repositories(&store),
        Arc::new(FailingCacheStore),
        ServiceConfig::default(),
    );
    (services, store)
}

pub fn new_user(name: &str) -> NewUser {
    NewUser {
        username: name.to_string(),
        email: format!("{}@example.com", name),
        password_hash: "$argon2id$v=19$stub".to_string(),
        first_name: name.to_string(),
        last_name: "Tester".to_string(),
        birthday: None,
    }
}

pub fn new_post(user_id: u64, content: &str) -> NewPost {
    NewPost {
        user_id,
        content: content.to_string(),
        image_url: None,
    }
}

pub async fn register(services: &Services, name: &str) -> User {
    services.users.register(new_user(name)).await.unwrap()
}
