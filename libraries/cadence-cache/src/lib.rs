//! Cadence Cache
//!
//! Implementations of [`cadence_core::PlaylistCache`]:
//!
//! - [`MemoryCache`]: bounded in-process LRU with per-key expiry
//! - `RedisCache` (feature `redis`): shared cache for multi-instance deployments
//! - [`NoopCache`]: never stores anything; reads always miss
//!
//! Caches are side caches: callers treat any cache failure as a miss and
//! fall back to the store.

mod error;
mod lock;
mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use error::CacheError;
pub use memory::MemoryCache;
#[cfg(feature = "redis")]
pub use redis::RedisCache;

use async_trait::async_trait;
use cadence_core::{PlaylistCache, Result};
use std::time::Duration;

/// Cache that stores nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl PlaylistCache for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}
