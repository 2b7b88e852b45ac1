/// Seam traits for the cache and the event feed
use crate::error::Result;
use crate::types::FeedMessage;
use async_trait::async_trait;
use std::time::Duration;

/// Key/value side cache with per-key expiration.
///
/// Never the source of truth. Values are opaque byte payloads produced and
/// consumed by the caller.
#[async_trait]
pub trait PlaylistCache: Send + Sync {
    /// Get a value; a missing or expired key is `Ok(None)`, not an error
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store a value that expires after `ttl`
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Remove a key; removing a missing key succeeds
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Append-only feed of messages consumed by a single logical subscriber.
///
/// Messages are delivered in order. A consumer calls `commit` once it is done
/// with a message so a durable source does not deliver it again.
#[async_trait]
pub trait EventSource: Send {
    /// Wait for the next message; `Ok(None)` once the feed is closed
    async fn next_message(&mut self) -> Result<Option<FeedMessage>>;

    /// Acknowledge everything up to and including `message`
    async fn commit(&mut self, message: &FeedMessage) -> Result<()>;

    /// Park a message that will never be processed successfully
    async fn dead_letter(&mut self, message: &FeedMessage, reason: &str) -> Result<()> {
        let _ = (message, reason);
        Ok(())
    }
}
