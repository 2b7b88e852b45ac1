//! Event feed message envelope

use chrono::{DateTime, Utc};

/// One message delivered by an `EventSource`.
///
/// The payload is kept as raw bytes; decoding it is the consumer's job so that
/// malformed messages can be reported without failing the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMessage {
    /// Topic the message was published to
    pub topic: String,

    /// Position of the message within its topic
    pub offset: i64,

    /// Partitioning key set by the producer (the track id for track events)
    pub key: Option<String>,

    /// Raw payload
    pub payload: Vec<u8>,

    /// When the producer appended the message
    pub published_at: DateTime<Utc>,
}

impl FeedMessage {
    /// Build a message that was never persisted (in-process feeds, tests)
    pub fn new(topic: impl Into<String>, offset: i64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            offset,
            key: None,
            payload: payload.into(),
            published_at: Utc::now(),
        }
    }

    /// Attach a producer key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Payload rendered for log output
    pub fn payload_lossy(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}
