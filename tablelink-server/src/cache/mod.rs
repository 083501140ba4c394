//! Session cache
//!
//! A small key/value abstraction with per-key TTL. Two backends implement it:
//! Redis for deployments and a process-local map for development and tests.
//! [`SessionCache`] layers the session key scheme on top.

pub mod memory;
pub mod redis;
pub mod session;

#[cfg(test)]
pub mod faulty;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryCache;
pub use self::redis::RedisCache;
pub use session::SessionCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("cache operation timed out")]
    Timeout,
    #[error("cache value could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// String key/value store with expiring entries
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Value for `key`, or `None` when absent or expired
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value, expiring after `ttl`
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Remove `key`; removing an absent key is not an error
    async fn delete(&self, key: &str) -> CacheResult<()>;
}
