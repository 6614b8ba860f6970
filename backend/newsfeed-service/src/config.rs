/// Configuration management for Newsfeed Service
///
/// Loads configuration from environment variables.
use anyhow::{Context, Result};
use rate_limit::RateLimitConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Redis configuration
    pub redis: RedisConfig,
    /// Feed and deadline settings
    pub service: ServiceConfig,
    /// Per-identity admission control
    pub rate_limit: RateLimitConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Default tracing directive
    pub log_level: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Min connections in pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL (redis://host:port)
    pub url: String,
}

/// Settings shared by every service operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Deadline for one orchestrated operation, in milliseconds
    #[serde(default = "default_context_timeout_ms")]
    pub context_timeout_ms: u64,
    /// Page size used when the caller does not supply one
    #[serde(default = "default_feed_page_size")]
    pub feed_page_size: u32,
    /// Likes and comments attached to each materialized post
    #[serde(default = "default_attachment_limit")]
    pub attachment_limit: u32,
}

impl ServiceConfig {
    pub fn context_timeout(&self) -> Duration {
        Duration::from_millis(self.context_timeout_ms)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            context_timeout_ms: default_context_timeout_ms(),
            feed_page_size: default_feed_page_size(),
            attachment_limit: default_attachment_limit(),
        }
    }
}

// Default values
fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_context_timeout_ms() -> u64 {
    5000
}

fn default_feed_page_size() -> u32 {
    10
}

fn default_attachment_limit() -> u32 {
    10
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL environment variable not set")?,
            max_connections: env_or("DB_MAX_CONNECTIONS", default_max_connections()),
            min_connections: env_or("DB_MIN_CONNECTIONS", default_min_connections()),
        };

        let redis = RedisConfig {
            url: std::env::var("REDIS_URL")
                .context("REDIS_URL environment variable not set")?,
        };

        let service = ServiceConfig {
            context_timeout_ms: env_or("CONTEXT_TIMEOUT_MS", default_context_timeout_ms()),
            feed_page_size: env_or("FEED_PAGE_SIZE", default_feed_page_size()),
            attachment_limit: env_or("ATTACHMENT_LIMIT", default_attachment_limit()),
        };

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            requests_per_second: env_or("RATE_LIMIT_RPS", defaults.requests_per_second),
            burst_size: env_or("RATE_LIMIT_BURST", defaults.burst_size),
            sweep_interval_secs: env_or("RATE_LIMIT_SWEEP_SECS", defaults.sweep_interval_secs),
        };

        if service.feed_page_size == 0 {
            anyhow::bail!("FEED_PAGE_SIZE must be greater than zero");
        }

        Ok(Config {
            app,
            database,
            redis,
            service,
            rate_limit,
        })
    }
}
