//! Cadence Core
//!
//! Domain types, seam traits, and error handling for the Cadence playlist service.
//!
//! This crate provides the building blocks shared by the storage, cache, and
//! server crates. It performs no I/O of its own.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `Playlist`, `PlaylistChanges`, identifiers
//! - **Seam Traits**: `PlaylistStore` (durable store), `PlaylistCache` (side cache),
//!   `EventSource` (track-creation feed)
//! - **Error Handling**: Unified `PlaylistError`, `ErrorKind` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use cadence_core::types::{Playlist, Track, UserId};
//!
//! let mut playlist = Playlist::draft("Road Trip", UserId::new("u1"));
//! playlist.tracks.push(Track::new("Song A", "Band X", 180));
//!
//! assert!(playlist.id.is_empty());
//! assert_eq!(playlist.tracks.len(), 1);
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod storage;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{ErrorKind, PlaylistError, Result};
pub use storage::PlaylistStore;
pub use traits::{EventSource, PlaylistCache};

pub use types::{
    cache_key_for_owner, FeedMessage, FieldChange, ObjectKey, Playlist, PlaylistChanges,
    PlaylistId, Track, TrackId, UserId, USER_PLAYLISTS_PREFIX,
};
