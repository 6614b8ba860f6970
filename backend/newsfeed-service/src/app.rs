//! Wiring of repositories, cache backend and services

use crate::cache::Caches;
use crate::config::{Config, ServiceConfig};
use crate::repository::{
    CommentRepository, LikeRepository, PgCommentRepository, PgLikeRepository, PgPostRepository,
    PgUserRepository, PostRepository, UserRepository,
};
use crate::services::{CommentService, FeedService, LikeService, PostService, UserService};
use anyhow::{Context, Result};
use feed_cache::{CacheMetrics, CacheStore, RedisCacheStore};
use prometheus::Registry;
use rate_limit::{spawn_sweeper, RateLimitConfig, RateLimiter, SweeperHandle};
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// System-of-record handles shared by every service
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub likes: Arc<dyn LikeRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            posts: Arc::new(PgPostRepository::new(pool.clone())),
            comments: Arc::new(PgCommentRepository::new(pool.clone())),
            likes: Arc::new(PgLikeRepository::new(pool)),
        }
    }
}

/// Every usecase, sharing one cache backend
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub posts: PostService,
    pub comments: CommentService,
    pub likes: LikeService,
    pub feed: FeedService,
}

impl Services {
    pub fn new(repos: Repositories, store: Arc<dyn CacheStore>, config: ServiceConfig) -> Self {
        let caches = Caches::new(store);

        Self {
            users: UserService::new(repos.clone(), caches.clone(), config.clone()),
            posts: PostService::new(repos.clone(), caches.clone(), config.clone()),
            comments: CommentService::new(repos.clone(), caches.clone(), config.clone()),
            likes: LikeService::new(repos.clone(), caches.clone(), config.clone()),
            feed: FeedService::new(repos, caches, config),
        }
    }

    /// Open the PostgreSQL pool, apply pending migrations and connect Redis
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .connect(&config.database.url)
            .await
            .context("Failed to connect to PostgreSQL")?;
        info!(
            max_connections = config.database.max_connections,
            "PostgreSQL pool ready"
        );

        MIGRATOR
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;

        let store = RedisCacheStore::connect(&config.redis.url)
            .await
            .context("Failed to connect to Redis")?;
        info!("Redis cache ready");

        Ok(Self::new(
            Repositories::postgres(pool),
            Arc::new(store),
            config.service.clone(),
        ))
    }

    /// Register the cache counters on `registry`
    pub fn register_metrics(registry: &Registry) -> Result<()> {
        CacheMetrics::register(registry)
            .map_err(|e| anyhow::anyhow!("Failed to register cache metrics: {}", e))
    }
}

/// Build the request limiter and start its hourly sweep. The sweep stops
/// when the returned handle is dropped.
pub fn start_rate_limiter(config: &RateLimitConfig) -> (Arc<RateLimiter>, SweeperHandle) {
    let limiter = Arc::new(RateLimiter::new(config));
    let sweeper = spawn_sweeper(Arc::clone(&limiter), config.sweep_interval());
    info!(
        rps = config.requests_per_second,
        burst = config.burst_size,
        sweep_secs = config.sweep_interval_secs,
        "Rate limiter started"
    );
    (limiter, sweeper)
}
