//! Cache metrics for observability

use prometheus::{CounterVec, Opts, Registry};
use std::sync::OnceLock;

static METRICS: OnceLock<CacheMetricsInner> = OnceLock::new();

struct CacheMetricsInner {
    hits: CounterVec,
    misses: CounterVec,
    writes: CounterVec,
    invalidations: CounterVec,
    errors: CounterVec,
}

impl CacheMetricsInner {
    fn new() -> Self {
        Self {
            hits: CounterVec::new(
                Opts::new("newsfeed_cache_hits_total", "Total cache hits"),
                &["family"],
            )
            .expect("valid metric definition"),
            misses: CounterVec::new(
                Opts::new("newsfeed_cache_misses_total", "Total cache misses"),
                &["family"],
            )
            .expect("valid metric definition"),
            writes: CounterVec::new(
                Opts::new("newsfeed_cache_writes_total", "Total cache writes"),
                &["family"],
            )
            .expect("valid metric definition"),
            invalidations: CounterVec::new(
                Opts::new(
                    "newsfeed_cache_invalidations_total",
                    "Total cache invalidations",
                ),
                &["family"],
            )
            .expect("valid metric definition"),
            errors: CounterVec::new(
                Opts::new("newsfeed_cache_errors_total", "Total cache errors"),
                &["family", "operation"],
            )
            .expect("valid metric definition"),
        }
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.hits.clone()))?;
        registry.register(Box::new(self.misses.clone()))?;
        registry.register(Box::new(self.writes.clone()))?;
        registry.register(Box::new(self.invalidations.clone()))?;
        registry.register(Box::new(self.errors.clone()))?;
        Ok(())
    }
}

fn get_metrics() -> &'static CacheMetricsInner {
    METRICS.get_or_init(CacheMetricsInner::new)
}

/// Cache metrics wrapper, labelled by cache family name
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheMetrics;

impl CacheMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Register metrics with a Prometheus registry
    pub fn register(registry: &Registry) -> Result<(), prometheus::Error> {
        get_metrics().register(registry)
    }

    pub fn record_hit(&self, family: &str) {
        get_metrics().hits.with_label_values(&[family]).inc();
    }

    pub fn record_miss(&self, family: &str) {
        get_metrics().misses.with_label_values(&[family]).inc();
    }

    pub fn record_write(&self, family: &str) {
        get_metrics().writes.with_label_values(&[family]).inc();
    }

    pub fn record_invalidation(&self, family: &str) {
        get_metrics()
            .invalidations
            .with_label_values(&[family])
            .inc();
    }

    pub fn record_error(&self, family: &str, operation: &str) {
        get_metrics()
            .errors
            .with_label_values(&[family, operation])
            .inc();
    }

    pub fn hits(&self, family: &str) -> f64 {
        get_metrics().hits.with_label_values(&[family]).get()
    }

    pub fn errors(&self, family: &str, operation: &str) -> f64 {
        get_metrics()
            .errors
            .with_label_values(&[family, operation])
            .get()
    }
}
