//! Newsfeed cache-aside layer
//!
//! Provides the building blocks every service uses in front of the
//! system-of-record:
//! - Deterministic key schema with family-scoped invalidation patterns
//! - A minimal [`CacheStore`] abstraction (Redis and in-process backends)
//! - Three TTL tiers chosen by volatility
//! - A generic typed [`EntityCache`] instantiated once per cache family
//! - Metrics integration
//!
//! Cache failures never escape [`EntityCache`]: a failed read is a miss, a
//! failed write or invalidation is logged and dropped.

mod entity;
mod error;
mod keys;
mod memory;
mod metrics;
mod redis_store;

pub use entity::{CacheFamily, EntityCache, PagedFamily};
pub use error::{CacheError, CacheResult};
pub use keys::{Family, Flag, KeyCodec, Subresource};
pub use memory::MemoryCacheStore;
pub use metrics::CacheMetrics;
pub use redis_store::{RedisCacheStore, SharedRedis};

use std::time::Duration;

/// TTL tiers, chosen per cache family by volatility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Newsfeed pages: 5 minutes
    Short,
    /// Single entities and per-entity paged collections: 15 minutes
    Default,
    /// Boolean relation flags: 60 minutes
    Long,
}

impl Ttl {
    pub const fn as_secs(self) -> u64 {
        match self {
            Ttl::Short => 300,
            Ttl::Default => 900,
            Ttl::Long => 3600,
        }
    }

    pub const fn duration(self) -> Duration {
        Duration::from_secs(self.as_secs())
    }
}

/// Key/value primitives over the cache backend.
///
/// All operations are fallible; callers treat every error as a miss.
/// `delete_by_prefix` may race with a concurrent `set` under the same prefix,
/// in which case the racing value survives until its TTL.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Get raw bytes, `None` on miss
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store raw bytes with a TTL
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Delete one key
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Delete every key matching a `prefix*` pattern, returning the count removed
    async fn delete_by_prefix(&self, pattern: &str) -> CacheResult<usize>;
}
