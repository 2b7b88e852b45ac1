//! Durable event feed
//!
//! An append-only log per topic plus a committed position per consumer group.
//! Producers `publish`; consumers read through [`SqliteFeed`], which
//! implements [`EventSource`] by polling for rows past its position.
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_storage::feed;
//!
//! # async fn example(pool: &sqlx::SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
//! let offset = feed::publish(pool, "track.created", Some("t1"), br#"{"title":"A"}"#).await?;
//! feed::commit(pool, "playlist-consumer-group", "track.created", offset).await?;
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use async_trait::async_trait;
use cadence_core::types::{now_millis, FeedMessage};
use cadence_core::{EventSource, PlaylistError};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::VecDeque;
use std::time::Duration;

/// A message a consumer group gave up on
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub id: i64,
    pub consumer_group: String,
    pub topic: String,
    pub offset: i64,
    pub payload: Vec<u8>,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

/// Append a message to a topic, returning its offset
pub async fn publish(
    pool: &SqlitePool,
    topic: &str,
    key: Option<&str>,
    payload: &[u8],
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO feed_events (topic, event_key, payload, published_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(topic)
    .bind(key)
    .bind(payload)
    .bind(now_millis().timestamp_millis())
    .execute(pool)
    .await?;

    let offset = result.last_insert_rowid();
    tracing::debug!(topic, offset, "Feed message published");

    Ok(offset)
}

/// Read up to `limit` messages of a topic with offset greater than `after`
pub async fn read_after(
    pool: &SqlitePool,
    topic: &str,
    after: i64,
    limit: i64,
) -> Result<Vec<FeedMessage>> {
    let rows = sqlx::query(
        r#"
        SELECT seq, topic, event_key, payload, published_at
        FROM feed_events
        WHERE topic = ? AND seq > ?
        ORDER BY seq ASC
        LIMIT ?
        "#,
    )
    .bind(topic)
    .bind(after)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(FeedMessage {
                topic: row.try_get("topic")?,
                offset: row.try_get("seq")?,
                key: row.try_get("event_key")?,
                payload: row.try_get("payload")?,
                published_at: millis_to_datetime(row.try_get("published_at")?),
            })
        })
        .collect()
}

/// Last committed offset of a consumer group, 0 before the first commit
pub async fn committed_offset(pool: &SqlitePool, group: &str, topic: &str) -> Result<i64> {
    let committed: Option<i64> = sqlx::query_scalar(
        "SELECT committed_seq FROM feed_offsets WHERE consumer_group = ? AND topic = ?",
    )
    .bind(group)
    .bind(topic)
    .fetch_optional(pool)
    .await?;

    Ok(committed.unwrap_or(0))
}

/// Record that a group is done with everything up to `offset`.
///
/// The committed position never moves backwards.
pub async fn commit(pool: &SqlitePool, group: &str, topic: &str, offset: i64) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO feed_offsets (consumer_group, topic, committed_seq, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(consumer_group, topic) DO UPDATE SET
            committed_seq = MAX(committed_seq, excluded.committed_seq),
            updated_at = excluded.updated_at
        "#,
    )
    .bind(group)
    .bind(topic)
    .bind(offset)
    .bind(now_millis().timestamp_millis())
    .execute(pool)
    .await?;

    Ok(())
}

/// Park a message for a group
pub async fn dead_letter(
    pool: &SqlitePool,
    group: &str,
    message: &FeedMessage,
    reason: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO feed_dead_letters (consumer_group, topic, seq, payload, reason, failed_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(group)
    .bind(&message.topic)
    .bind(message.offset)
    .bind(&message.payload)
    .bind(reason)
    .bind(now_millis().timestamp_millis())
    .execute(pool)
    .await?;

    tracing::warn!(
        group,
        topic = %message.topic,
        offset = message.offset,
        reason,
        "Feed message dead-lettered"
    );

    Ok(())
}

/// Dead letters of a group and topic, oldest first
pub async fn dead_letters(pool: &SqlitePool, group: &str, topic: &str) -> Result<Vec<DeadLetter>> {
    let rows = sqlx::query(
        r#"
        SELECT id, consumer_group, topic, seq, payload, reason, failed_at
        FROM feed_dead_letters
        WHERE consumer_group = ? AND topic = ?
        ORDER BY id ASC
        "#,
    )
    .bind(group)
    .bind(topic)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(DeadLetter {
                id: row.try_get("id")?,
                consumer_group: row.try_get("consumer_group")?,
                topic: row.try_get("topic")?,
                offset: row.try_get("seq")?,
                payload: row.try_get("payload")?,
                reason: row.try_get("reason")?,
                failed_at: millis_to_datetime(row.try_get("failed_at")?),
            })
        })
        .collect()
}

/// Number of messages published after the group's committed offset
pub async fn lag(pool: &SqlitePool, group: &str, topic: &str) -> Result<i64> {
    let committed = committed_offset(pool, group, topic).await?;
    let pending: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM feed_events WHERE topic = ? AND seq > ?")
            .bind(topic)
            .bind(committed)
            .fetch_one(pool)
            .await?;

    Ok(pending)
}

const DEFAULT_BATCH_SIZE: i64 = 64;

/// Polling consumer of one topic for one consumer group.
///
/// Starts after the group's committed offset, so a restarted consumer
/// resumes where the previous one stopped committing. Never returns
/// `Ok(None)`; it waits for new messages until the caller stops polling.
pub struct SqliteFeed {
    pool: SqlitePool,
    topic: String,
    group: String,
    poll_interval: Duration,
    batch_size: i64,
    position: Option<i64>,
    buffer: VecDeque<FeedMessage>,
}

impl SqliteFeed {
    pub fn new(
        pool: SqlitePool,
        topic: impl Into<String>,
        group: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            pool,
            topic: topic.into(),
            group: group.into(),
            poll_interval,
            batch_size: DEFAULT_BATCH_SIZE,
            position: None,
            buffer: VecDeque::new(),
        }
    }

    /// Maximum number of messages fetched per poll
    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    async fn fill(&mut self) -> Result<()> {
        let after = match self.position {
            Some(position) => position,
            None => {
                let committed = committed_offset(&self.pool, &self.group, &self.topic).await?;
                tracing::info!(
                    topic = %self.topic,
                    group = %self.group,
                    committed,
                    "Feed consumer starting"
                );
                self.position = Some(committed);
                committed
            }
        };

        let batch = read_after(&self.pool, &self.topic, after, self.batch_size).await?;
        if let Some(last) = batch.last() {
            self.position = Some(last.offset);
        }
        self.buffer.extend(batch);
        Ok(())
    }
}

fn feed_error(err: crate::StorageError) -> PlaylistError {
    PlaylistError::feed(err.to_string())
}

#[async_trait]
impl EventSource for SqliteFeed {
    async fn next_message(&mut self) -> cadence_core::Result<Option<FeedMessage>> {
        loop {
            if let Some(message) = self.buffer.pop_front() {
                return Ok(Some(message));
            }
            self.fill().await.map_err(feed_error)?;
            if self.buffer.is_empty() {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
    }

    async fn commit(&mut self, message: &FeedMessage) -> cadence_core::Result<()> {
        commit(&self.pool, &self.group, &self.topic, message.offset)
            .await
            .map_err(feed_error)
    }

    async fn dead_letter(&mut self, message: &FeedMessage, reason: &str) -> cadence_core::Result<()> {
        dead_letter(&self.pool, &self.group, message, reason)
            .await
            .map_err(feed_error)
    }
}
