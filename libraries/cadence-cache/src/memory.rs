//! In-process LRU cache with per-key expiry.
//!
//! Expired entries are dropped lazily on read; capacity pressure evicts the
//! least recently used entry. Deadlines use `tokio::time::Instant`, so tests
//! running on a paused clock can advance past a TTL without sleeping.

use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use cadence_core::{PlaylistCache, Result};
use lru::LruCache;
use tokio::time::Instant;

use crate::error::CacheError;
use crate::lock::{rw_read, rw_write};

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

pub struct MemoryCache {
    entries: RwLock<LruCache<String, Entry>>,
}

impl MemoryCache {
    /// Create a cache holding at most `capacity` keys.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ZeroCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize) -> std::result::Result<Self, CacheError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(CacheError::ZeroCapacity)?;
        Ok(Self {
            entries: RwLock::new(LruCache::new(capacity)),
        })
    }

    /// Number of stored entries, expired ones included until they are read
    pub fn len(&self) -> usize {
        rw_read(&self.entries, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        rw_write(&self.entries, "clear").clear();
    }
}

#[async_trait]
impl PlaylistCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, "get");

        let expired = match entries.get(key) {
            Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
            tracing::trace!(key, "Cache entry expired");
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        rw_write(&self.entries, "set").put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        rw_write(&self.entries, "delete").pop(key);
        Ok(())
    }
}
