//! Redis-backed [`CacheStore`]

use crate::{CacheError, CacheResult, CacheStore};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Pipeline};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Shared Redis connection manager
pub type SharedRedis = Arc<Mutex<ConnectionManager>>;

/// Keys fetched per SCAN round trip
const SCAN_BATCH: usize = 100;

#[derive(Clone)]
pub struct RedisCacheStore {
    redis: SharedRedis,
}

impl RedisCacheStore {
    pub fn new(redis: SharedRedis) -> Self {
        Self { redis }
    }

    /// Open a connection manager for `redis_url`
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        let client = Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(Arc::new(Mutex::new(manager))))
    }

    /// Add 0-10% jitter to TTL so entries written together do not expire together
    fn add_jitter(ttl_secs: u64) -> u64 {
        let jitter_percent = (rand::random::<u32>() % 10) as f64 / 100.0;
        let jitter = (ttl_secs as f64 * jitter_percent).round() as u64;
        ttl_secs + jitter
    }
}

#[async_trait::async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.redis.lock().await;
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(CacheError::Redis)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let ttl_with_jitter = Self::add_jitter(ttl.as_secs().max(1));

        let mut conn = self.redis.lock().await;
        conn.set_ex::<_, _, ()>(key, value, ttl_with_jitter)
            .await
            .map_err(CacheError::Redis)?;

        debug!(key = %key, ttl = ttl_with_jitter, "Cache set");
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.redis.lock().await;
        conn.del::<_, ()>(key).await.map_err(CacheError::Redis)?;
        Ok(())
    }

    async fn delete_by_prefix(&self, pattern: &str) -> CacheResult<usize> {
        let mut conn = self.redis.lock().await;
        let mut cursor: u64 = 0;
        let mut total_deleted = 0;

        loop {
            // SCAN rather than KEYS so large keyspaces do not block the server
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut *conn)
                .await
                .map_err(CacheError::Redis)?;

            if !keys.is_empty() {
                let mut pipe = Pipeline::new();
                for key in &keys {
                    pipe.del(key);
                }
                pipe.query_async::<_, ()>(&mut *conn)
                    .await
                    .map_err(CacheError::Redis)?;

                total_deleted += keys.len();
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern = %pattern, deleted = total_deleted, "Cache scan delete");
        Ok(total_deleted)
    }
}
