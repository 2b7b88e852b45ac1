//! Durable store trait for playlist documents

use crate::error::Result;
use crate::types::{Playlist, PlaylistChanges, PlaylistId, Track, TrackId, UserId};
use async_trait::async_trait;

/// Authoritative storage for playlists.
///
/// One document per playlist, addressed by its identifier. Implementations
/// must be safe for concurrent use and must apply each mutation atomically
/// to a single document.
///
/// Identifiers may exist in two physical encodings (an opaque string or a
/// structured 12-byte key exposed as 24 hex chars); implementations resolve
/// both transparently so callers never need to know which one a record uses.
#[async_trait]
pub trait PlaylistStore: Send + Sync {
    /// Persist a new playlist.
    ///
    /// Assigns an identifier when the draft has none and stamps
    /// `created_at == updated_at`.
    async fn create(&self, playlist: Playlist) -> Result<Playlist>;

    /// Get a playlist by ID, `PlaylistNotFound` if absent
    async fn get_by_id(&self, id: &PlaylistId) -> Result<Playlist>;

    /// All playlists owned by a user (empty when none)
    async fn get_by_owner(&self, owner_id: &UserId) -> Result<Vec<Playlist>>;

    /// Look up a playlist by exact name.
    ///
    /// `Ok(None)` means "no such playlist"; `Err` means the lookup failed.
    async fn get_by_name(&self, name: &str) -> Result<Option<Playlist>>;

    /// Write the `Set` fields of a change set; refreshes `updated_at`.
    ///
    /// Tracks are left as stored, so concurrent appends survive a rename.
    async fn update(&self, id: &PlaylistId, changes: &PlaylistChanges) -> Result<Playlist>;

    /// Append a track.
    ///
    /// Generates a track ID when the track has none. Refuses a track whose
    /// non-empty ID is already present with `TrackAlreadyExists`.
    async fn add_track(&self, playlist_id: &PlaylistId, track: Track) -> Result<Playlist>;

    /// Remove a track by ID
    async fn remove_track(&self, playlist_id: &PlaylistId, track_id: &TrackId)
        -> Result<Playlist>;

    /// Delete a playlist after verifying ownership.
    ///
    /// `PermissionDenied` on owner mismatch, distinct from `PlaylistNotFound`.
    async fn delete(&self, id: &PlaylistId, owner_id: &UserId) -> Result<()>;
}
