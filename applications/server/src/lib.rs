//! Cadence Server Library
//!
//! Playlist service with a read-through owner cache and a background worker
//! that collects newly published tracks into a shared playlist.
//!
//! This library exposes the core components for testing purposes.

pub mod api;
pub mod config;
pub mod error;
pub mod jobs;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::{CacheBackend, ServerConfig};
pub use error::{Result, ServerError};
pub use jobs::{IngestionWorker, WorkerHandle};
pub use services::{PlaylistService, ServiceSettings};
pub use state::AppState;
