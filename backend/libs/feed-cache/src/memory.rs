//! In-process [`CacheStore`] honouring TTLs.
//!
//! Expiry uses `tokio::time::Instant`, so tests running on a paused clock can
//! move past a TTL with `tokio::time::advance`.

use crate::{CacheResult, CacheStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

#[derive(Clone, Default)]
pub struct MemoryCacheStore {
    data: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let data = self.data.read().await;
        data.values().filter(|e| e.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains_key(&self, key: &str) -> bool {
        let data = self.data.read().await;
        data.get(key)
            .map(|e| e.expires_at > Instant::now())
            .unwrap_or(false)
    }
}

/// Only the `prefix*` form of glob is supported; anything else matches exactly.
fn matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let now = Instant::now();
        {
            let data = self.data.read().await;
            match data.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired - remove it
        let mut data = self.data.write().await;
        if data.get(key).map(|e| e.expires_at <= now).unwrap_or(false) {
            data.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let mut data = self.data.write().await;
        data.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut data = self.data.write().await;
        data.remove(key);
        Ok(())
    }

    async fn delete_by_prefix(&self, pattern: &str) -> CacheResult<usize> {
        let mut data = self.data.write().await;
        let before = data.len();
        data.retain(|key, _| !matches(pattern, key));
        Ok(before - data.len())
    }
}
