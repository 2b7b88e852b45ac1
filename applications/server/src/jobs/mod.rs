/// Background jobs
pub mod ingestion;

pub use ingestion::{
    channel, ChannelAcks, ChannelEventSource, ChannelPublisher, IngestOutcome, IngestStats,
    IngestionSettings, IngestionWorker, WorkerHandle,
};
