//! Per-identity rate limiting
//!
//! Every identity (client IP or authenticated user) gets its own token bucket,
//! created lazily on first sight. Lookups take a shared lock; only inserting a
//! new bucket takes the exclusive lock, and the insert re-checks the map so two
//! concurrent first requests for one identity always share a single bucket.
//!
//! The map is cleared wholesale by a background sweeper (hourly by default) to
//! bound memory under identity churn. A sweep resets every identity's burst
//! allowance.

mod sweeper;

pub use sweeper::{spawn_sweeper, SweeperHandle};

use governor::{DefaultDirectRateLimiter, Quota};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Tokens added to each bucket per second
    pub requests_per_second: u32,
    /// Bucket capacity
    pub burst_size: u32,
    /// Interval between full resets of the identity map
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst_size: 20,
            sweep_interval_secs: 3600, // 1 hour
        }
    }
}

impl RateLimitConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// `None` when either rate or burst is zero: no request can ever be admitted.
    fn quota(&self) -> Option<Quota> {
        let rate = NonZeroU32::new(self.requests_per_second)?;
        let burst = NonZeroU32::new(self.burst_size)?;
        Some(Quota::per_second(rate).allow_burst(burst))
    }
}

/// Rate limit key builder
pub struct RateLimitKey;

impl RateLimitKey {
    /// Authenticated callers are limited per user, anonymous callers per address.
    pub fn resolve(user_id: Option<u64>, remote_addr: &str) -> String {
        match user_id {
            Some(id) => format!("user:{}", id),
            None => format!("ip:{}", remote_addr),
        }
    }
}

pub struct RateLimiter {
    limiters: RwLock<HashMap<String, Arc<DefaultDirectRateLimiter>>>,
    quota: Option<Quota>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            limiters: RwLock::new(HashMap::new()),
            quota: config.quota(),
        }
    }

    /// Consume one token from `key`'s bucket, creating the bucket on first sight.
    pub fn allow(&self, key: &str) -> bool {
        let Some(quota) = self.quota else {
            return false;
        };

        let allowed = self.bucket(key, quota).check().is_ok();
        if !allowed {
            debug!(key = %key, "Rate limit exceeded");
        }
        allowed
    }

    fn bucket(&self, key: &str, quota: Quota) -> Arc<DefaultDirectRateLimiter> {
        if let Some(limiter) = self.limiters.read().get(key) {
            return Arc::clone(limiter);
        }

        let mut limiters = self.limiters.write();
        // Another caller may have inserted between the two locks
        let limiter = limiters.entry(key.to_string()).or_insert_with(|| {
            debug!(key = %key, "Creating rate limit bucket");
            Arc::new(governor::RateLimiter::direct(quota))
        });
        Arc::clone(limiter)
    }

    /// Drop every bucket, returning how many were tracked
    pub fn clear(&self) -> usize {
        let mut limiters = self.limiters.write();
        let cleared = limiters.len();
        limiters.clear();
        cleared
    }

    /// Number of identities currently tracked
    pub fn len(&self) -> usize {
        self.limiters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
