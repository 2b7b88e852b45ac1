//! Track-event ingestion into the shared new-releases playlist
//!
//! A single consumer reads track-creation events in delivery order and
//! appends each track to one well-known playlist, creating that playlist on
//! the first event. Processing is idempotent per track id: an event whose
//! track is already present changes nothing.
//!
//! Failure policy:
//!
//! - payloads that do not decode into a valid track are dead-lettered at once
//! - backend failures are retried up to `max_attempts` with linear backoff,
//!   then dead-lettered
//! - every message is committed once handled, so one bad event never stalls
//!   the feed

use crate::services::PlaylistService;
use cadence_core::{
    EventSource, FeedMessage, PlaylistError, PlaylistId, Result, Track, UserId,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct IngestionSettings {
    pub playlist_name: String,
    pub system_owner: UserId,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            playlist_name: "Новинки".to_string(),
            system_owner: UserId::new("system"),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

/// What processing one event did to the shared playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The shared playlist did not exist and was created with this track
    Created(PlaylistId),
    /// The track was appended
    Appended(PlaylistId),
    /// The track was already present; nothing was written
    AlreadyPresent(PlaylistId),
}

/// Counters for one run of the worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub created: u64,
    pub appended: u64,
    pub duplicates: u64,
    pub dead_lettered: u64,
}

impl IngestStats {
    fn record(&mut self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::Created(_) => self.created += 1,
            IngestOutcome::Appended(_) => self.appended += 1,
            IngestOutcome::AlreadyPresent(_) => self.duplicates += 1,
        }
    }

    pub fn handled(&self) -> u64 {
        self.created + self.appended + self.duplicates + self.dead_lettered
    }
}

/// Decode an event payload into a track
pub fn decode_track(payload: &[u8]) -> Result<Track> {
    let track: Track = serde_json::from_slice(payload)
        .map_err(|e| PlaylistError::invalid_argument(format!("malformed track event: {e}")))?;

    if track.title.is_empty() || track.artist.is_empty() {
        return Err(PlaylistError::invalid_argument(
            "track event is missing title or artist",
        ));
    }
    Ok(track)
}

#[derive(Clone)]
pub struct IngestionWorker {
    service: PlaylistService,
    settings: IngestionSettings,
}

impl IngestionWorker {
    pub fn new(service: PlaylistService, settings: IngestionSettings) -> Self {
        Self { service, settings }
    }

    /// Upsert one track into the shared playlist
    pub async fn ingest(&self, track: Track) -> Result<IngestOutcome> {
        let existing = self
            .service
            .find_playlist_by_name(&self.settings.playlist_name)
            .await?;

        let Some(shared) = existing else {
            let created = self
                .service
                .create_playlist(
                    &self.settings.playlist_name,
                    &self.settings.system_owner,
                    None,
                    vec![track],
                )
                .await?;
            tracing::info!(playlist_id = %created.id, name = %created.name, "Shared playlist created");
            return Ok(IngestOutcome::Created(created.id));
        };

        if shared.contains_track(&track) {
            return Ok(IngestOutcome::AlreadyPresent(shared.id));
        }

        match self.service.add_track_to_playlist(&shared.id, track).await {
            Ok(updated) => Ok(IngestOutcome::Appended(updated.id)),
            // Another writer appended the same track between our read and write
            Err(PlaylistError::TrackAlreadyExists { .. }) => {
                Ok(IngestOutcome::AlreadyPresent(shared.id))
            }
            Err(e) => Err(e),
        }
    }

    /// Decode and ingest a raw payload
    pub async fn handle_payload(&self, payload: &[u8]) -> Result<IngestOutcome> {
        let track = decode_track(payload)?;
        self.ingest(track).await
    }

    async fn process<S: EventSource>(
        &self,
        source: &mut S,
        message: &FeedMessage,
        stats: &mut IngestStats,
    ) {
        let mut attempt = 1;
        let failure = loop {
            match self.handle_payload(&message.payload).await {
                Ok(outcome) => {
                    tracing::debug!(offset = message.offset, ?outcome, "Track event ingested");
                    stats.record(&outcome);
                    break None;
                }
                Err(e) if e.is_transient() && attempt < self.settings.max_attempts => {
                    tracing::warn!(
                        offset = message.offset,
                        attempt,
                        error = %e,
                        "Track event failed, retrying"
                    );
                    tokio::time::sleep(self.settings.retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => break Some(e),
            }
        };

        if let Some(e) = failure {
            tracing::error!(
                offset = message.offset,
                attempt,
                error = %e,
                payload = %message.payload_lossy(),
                "Dropping track event"
            );
            stats.dead_lettered += 1;
            if let Err(dl) = source.dead_letter(message, &e.to_string()).await {
                tracing::error!(offset = message.offset, error = %dl, "Could not dead-letter event");
            }
        }

        if let Err(e) = source.commit(message).await {
            tracing::error!(offset = message.offset, error = %e, "Could not commit event");
        }
    }

    async fn consume<S: EventSource>(
        &self,
        source: &mut S,
        mut shutdown: Option<watch::Receiver<bool>>,
    ) -> IngestStats {
        let mut stats = IngestStats::default();

        loop {
            let next = match shutdown.as_mut() {
                Some(shutdown) => {
                    if *shutdown.borrow() {
                        break;
                    }
                    tokio::select! {
                        biased;
                        _ = shutdown.changed() => break,
                        next = source.next_message() => next,
                    }
                }
                None => source.next_message().await,
            };

            match next {
                Ok(Some(message)) => self.process(source, &message, &mut stats).await,
                Ok(None) => {
                    tracing::info!("Event source closed");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Event source failed, backing off");
                    tokio::time::sleep(self.settings.retry_backoff).await;
                }
            }
        }

        stats
    }

    /// Consume `source` until it reports that it is closed
    pub async fn run<S: EventSource>(&self, mut source: S) -> IngestStats {
        let stats = self.consume(&mut source, None).await;
        tracing::info!(?stats, "Ingestion finished");
        stats
    }

    /// Run on a background task until shutdown or until the source closes
    pub fn spawn<S: EventSource + 'static>(self, mut source: S) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            tracing::info!(playlist = %self.settings.playlist_name, "Ingestion worker started");
            let stats = self.consume(&mut source, Some(shutdown_rx)).await;
            tracing::info!(?stats, "Ingestion worker stopped");
            stats
        });

        WorkerHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a spawned ingestion worker
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<IngestStats>,
}

impl WorkerHandle {
    /// Stop after the event in progress, if any, and wait for the task
    pub async fn shutdown(self) -> IngestStats {
        let _ = self.shutdown.send(true);
        self.join().await
    }

    /// Wait for the worker to stop on its own
    pub async fn join(self) -> IngestStats {
        match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(error = %e, "Ingestion worker task failed");
                IngestStats::default()
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Offsets committed and messages dead-lettered by a [`ChannelEventSource`]
#[derive(Debug, Clone, Default)]
pub struct ChannelAcks {
    inner: Arc<Mutex<AckLog>>,
}

#[derive(Debug, Default)]
struct AckLog {
    committed: Option<i64>,
    dead_letters: Vec<(i64, String)>,
}

impl ChannelAcks {
    pub fn committed(&self) -> Option<i64> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .committed
    }

    /// `(offset, reason)` of every dead-lettered message
    pub fn dead_letters(&self) -> Vec<(i64, String)> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .dead_letters
            .clone()
    }
}

/// Producer side of an in-process feed
#[derive(Clone)]
pub struct ChannelPublisher {
    topic: String,
    tx: mpsc::Sender<FeedMessage>,
    next_offset: Arc<Mutex<i64>>,
}

impl ChannelPublisher {
    /// Send a payload, returning its offset
    pub async fn publish(&self, key: Option<&str>, payload: impl Into<Vec<u8>>) -> Result<i64> {
        let offset = {
            let mut next = self
                .next_offset
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *next += 1;
            *next
        };

        let mut message = FeedMessage::new(self.topic.clone(), offset, payload);
        if let Some(key) = key {
            message = message.with_key(key);
        }

        self.tx
            .send(message)
            .await
            .map_err(|_| PlaylistError::feed("event source dropped"))?;
        Ok(offset)
    }

    /// Serialize and send a track event
    pub async fn publish_track(&self, track: &Track) -> Result<i64> {
        let payload = serde_json::to_vec(track)?;
        let key = (!track.id.is_empty()).then_some(track.id.as_str());
        self.publish(key, payload).await
    }
}

/// In-process event source fed through a bounded channel.
///
/// Closes once every [`ChannelPublisher`] has been dropped and the buffer is
/// drained.
pub struct ChannelEventSource {
    rx: mpsc::Receiver<FeedMessage>,
    acks: ChannelAcks,
}

impl ChannelEventSource {
    pub fn acks(&self) -> ChannelAcks {
        self.acks.clone()
    }
}

/// Create a connected publisher and source
pub fn channel(topic: impl Into<String>, capacity: usize) -> (ChannelPublisher, ChannelEventSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        ChannelPublisher {
            topic: topic.into(),
            tx,
            next_offset: Arc::new(Mutex::new(0)),
        },
        ChannelEventSource {
            rx,
            acks: ChannelAcks::default(),
        },
    )
}

#[async_trait::async_trait]
impl EventSource for ChannelEventSource {
    async fn next_message(&mut self) -> Result<Option<FeedMessage>> {
        Ok(self.rx.recv().await)
    }

    async fn commit(&mut self, message: &FeedMessage) -> Result<()> {
        let mut log = self
            .acks
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        log.committed = Some(log.committed.map_or(message.offset, |c| c.max(message.offset)));
        Ok(())
    }

    async fn dead_letter(&mut self, message: &FeedMessage, reason: &str) -> Result<()> {
        self.acks
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .dead_letters
            .push((message.offset, reason.to_string()));
        Ok(())
    }
}
