//! Newsfeed backend core
//!
//! Users, posts, comments, likes and the follow graph over PostgreSQL, with a
//! cache-aside layer (see `feed-cache`) in front of every read and a
//! fan-out-on-read newsfeed. Request admission lives in `rate-limit`; HTTP
//! routing and authentication are left to the hosting process.

pub mod app;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod repository;
pub mod services;
pub mod telemetry;

pub use app::{start_rate_limiter, Repositories, Services};
pub use error::{ServiceError, ServiceResult};
