//! Typed read/write/invalidate wrapper shared by every cache family.
//!
//! A family only contributes its key derivation and TTL tier; encoding,
//! metrics and failure handling live here once.

use crate::{CacheMetrics, CacheStore, Ttl};
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

/// One cache family: how its keys are derived and how long entries live.
pub trait CacheFamily: Send + Sync + 'static {
    /// Identifier the key is derived from (entity id, `(owner, page)`, ...)
    type Id: Send + Sync;
    /// Stored representation
    type Value: Serialize + DeserializeOwned + Send + Sync;

    /// Metrics label
    const NAME: &'static str;
    const TTL: Ttl;

    fn key(id: &Self::Id) -> String;
}

/// Families whose entries are pages of one owner's collection.
pub trait PagedFamily: CacheFamily {
    type Owner: Send + Sync;

    /// Pattern matching every cached page of `owner`
    fn pages_pattern(owner: &Self::Owner) -> String;
}

pub struct EntityCache<F> {
    store: Arc<dyn CacheStore>,
    metrics: CacheMetrics,
    _family: PhantomData<fn() -> F>,
}

impl<F> Clone for EntityCache<F> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            metrics: self.metrics,
            _family: PhantomData,
        }
    }
}

impl<F: CacheFamily> EntityCache<F> {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            metrics: CacheMetrics::new(),
            _family: PhantomData,
        }
    }

    /// Look up the cache. Backend errors and undecodable entries are misses.
    pub async fn read(&self, id: &F::Id) -> Option<F::Value> {
        let key = F::key(id);

        match self.store.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<F::Value>(&bytes) {
                Ok(value) => {
                    debug!(key = %key, "Cache hit");
                    self.metrics.record_hit(F::NAME);
                    Some(value)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Cache deserialization failed");
                    self.metrics.record_error(F::NAME, "decode");
                    // Drop the corrupted entry so the next reader repopulates it
                    if let Err(e) = self.store.delete(&key).await {
                        warn!(key = %key, error = %e, "Failed to delete corrupted cache entry");
                    }
                    None
                }
            },
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                self.metrics.record_miss(F::NAME);
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, falling back to store");
                self.metrics.record_error(F::NAME, "get");
                None
            }
        }
    }

    /// Encode and store with the family TTL. Failures are logged and dropped.
    pub async fn write(&self, id: &F::Id, value: &F::Value) {
        let key = F::key(id);

        let data = match serde_json::to_vec(value) {
            Ok(data) => data,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache serialization failed");
                self.metrics.record_error(F::NAME, "encode");
                return;
            }
        };

        match self.store.set(&key, &data, F::TTL.duration()).await {
            Ok(()) => {
                debug!(key = %key, ttl = F::TTL.as_secs(), "Cache write");
                self.metrics.record_write(F::NAME);
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache write failed");
                self.metrics.record_error(F::NAME, "set");
            }
        }
    }

    /// Delete the single key for `id`
    pub async fn invalidate(&self, id: &F::Id) {
        let key = F::key(id);

        match self.store.delete(&key).await {
            Ok(()) => {
                debug!(key = %key, "Cache invalidate");
                self.metrics.record_invalidation(F::NAME);
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache invalidation failed");
                self.metrics.record_error(F::NAME, "delete");
            }
        }
    }

    /// Delete every key matching `pattern`
    pub async fn invalidate_pattern(&self, pattern: &str) {
        match self.store.delete_by_prefix(pattern).await {
            Ok(deleted) => {
                debug!(pattern = %pattern, deleted, "Cache pattern invalidate");
                self.metrics.record_invalidation(F::NAME);
            }
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Cache pattern invalidation failed");
                self.metrics.record_error(F::NAME, "delete_pattern");
            }
        }
    }
}

impl<F: PagedFamily> EntityCache<F> {
    /// Delete every cached page of `owner`
    pub async fn invalidate_pages(&self, owner: &F::Owner) {
        self.invalidate_pattern(&F::pages_pattern(owner)).await;
    }
}
