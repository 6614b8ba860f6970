//! Read-through and deadline helpers shared by every service

use crate::error::{ServiceError, ServiceResult};
use feed_cache::{CacheFamily, EntityCache};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// Cache-aside read of a single entity. A miss loads from the store and
/// repopulates the cache when the entity exists.
pub(crate) async fn load_entity<F, L, Fut>(
    cache: &EntityCache<F>,
    id: &F::Id,
    load: L,
) -> ServiceResult<Option<F::Value>>
where
    F: CacheFamily,
    L: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<Option<F::Value>>>,
{
    if let Some(value) = cache.read(id).await {
        return Ok(Some(value));
    }

    let loaded = load().await?;
    if let Some(value) = &loaded {
        cache.write(id, value).await;
    }
    Ok(loaded)
}

/// Cache-aside read of a value that always exists (pages, lists, flags).
/// Empty results are cached too.
pub(crate) async fn load_value<F, L, Fut>(
    cache: &EntityCache<F>,
    id: &F::Id,
    load: L,
) -> ServiceResult<F::Value>
where
    F: CacheFamily,
    L: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<F::Value>>,
{
    if let Some(value) = cache.read(id).await {
        return Ok(value);
    }

    let loaded = load().await?;
    cache.write(id, &loaded).await;
    Ok(loaded)
}

/// Run one orchestrated operation under a single deadline. Steps still
/// pending when it elapses are dropped, including cache writes.
pub(crate) async fn with_deadline<T, Fut>(
    operation: &'static str,
    deadline: Duration,
    future: Fut,
) -> ServiceResult<T>
where
    Fut: Future<Output = ServiceResult<T>>,
{
    match timeout(deadline, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                operation,
                deadline_ms = deadline.as_millis() as u64,
                "Operation deadline exceeded"
            );
            Err(ServiceError::Timeout(deadline.as_millis() as u64))
        }
    }
}

/// Validate a 1-based page request and return the row offset
pub(crate) fn page_offset(page: u32, limit: u32) -> ServiceResult<u64> {
    if page == 0 {
        return Err(ServiceError::InvalidInput("page must be at least 1".into()));
    }
    if limit == 0 {
        return Err(ServiceError::InvalidInput("page size must be at least 1".into()));
    }
    Ok(u64::from(page - 1) * u64::from(limit))
}
