//! Playlist aggregate service
//!
//! Validates input, then coordinates the authoritative store with the
//! owner-list side cache:
//!
//! - reads of an owner's playlists go through the cache (read-through)
//! - every mutation deletes the owner's cache entry (write-invalidate)
//!
//! For add/remove/update the entry is deleted *before* the store call, so a
//! read cannot repopulate the cache from data older than a mutation that is
//! still in flight. A failed mutation then costs one extra cache miss.
//! Cache failures never fail an operation; they are logged and the store
//! answers instead.

use cadence_core::{
    cache_key_for_owner, FieldChange, Playlist, PlaylistCache, PlaylistChanges, PlaylistError,
    PlaylistId, PlaylistStore, Result, Track, TrackId, UserId,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Timing policy of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    /// TTL of owner-list cache entries
    pub cache_ttl: Duration,
    /// Upper bound for a single store call
    pub store_timeout: Duration,
    /// Upper bound for a single cache call
    pub cache_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(600),
            store_timeout: Duration::from_secs(5),
            cache_timeout: Duration::from_millis(500),
        }
    }
}

#[derive(Clone)]
pub struct PlaylistService {
    store: Arc<dyn PlaylistStore>,
    cache: Arc<dyn PlaylistCache>,
    settings: ServiceSettings,
}

fn require(value: &str, field: &str) -> Result<()> {
    if value.is_empty() {
        return Err(PlaylistError::invalid_argument(format!(
            "{field} cannot be empty"
        )));
    }
    Ok(())
}

impl PlaylistService {
    pub fn new(
        store: Arc<dyn PlaylistStore>,
        cache: Arc<dyn PlaylistCache>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            cache,
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    async fn store_call<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.settings.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation, timeout = ?self.settings.store_timeout, "Store call timed out");
                Err(PlaylistError::Timeout { operation })
            }
        }
    }

    async fn cache_call<T, F>(&self, operation: &'static str, key: &str, call: F) -> Option<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.settings.cache_timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                tracing::warn!(operation, key, error = %e, "Cache call failed");
                None
            }
            Err(_) => {
                tracing::warn!(operation, key, "Cache call timed out");
                None
            }
        }
    }

    /// Best-effort delete of the owner's cached playlist list
    async fn invalidate_owner(&self, owner_id: &UserId) {
        let key = cache_key_for_owner(owner_id);
        if self
            .cache_call("delete", &key, self.cache.delete(&key))
            .await
            .is_some()
        {
            tracing::debug!(key = %key, "Owner playlists invalidated");
        }
    }

    /// Create a playlist for `owner_id`
    pub async fn create_playlist(
        &self,
        name: &str,
        owner_id: &UserId,
        description: Option<String>,
        tracks: Vec<Track>,
    ) -> Result<Playlist> {
        require(name, "playlist name")?;
        require(owner_id.as_str(), "owner id")?;

        let draft = Playlist::draft(name, owner_id.clone())
            .with_description(description)
            .with_tracks(tracks);
        let playlist = self.store_call("create", self.store.create(draft)).await?;

        self.invalidate_owner(owner_id).await;
        tracing::info!(playlist_id = %playlist.id, owner_id = %owner_id, "Playlist created");

        Ok(playlist)
    }

    /// Fetch one playlist; never cached
    pub async fn get_playlist(&self, id: &PlaylistId) -> Result<Playlist> {
        require(id.as_str(), "playlist id")?;
        self.store_call("get_by_id", self.store.get_by_id(id)).await
    }

    /// All playlists owned by `owner_id`, read through the cache
    pub async fn get_user_playlists(&self, owner_id: &UserId) -> Result<Vec<Playlist>> {
        require(owner_id.as_str(), "owner id")?;
        let key = cache_key_for_owner(owner_id);

        if let Some(Some(bytes)) = self.cache_call("get", &key, self.cache.get(&key)).await {
            match serde_json::from_slice::<Vec<Playlist>>(&bytes) {
                Ok(playlists) => {
                    tracing::debug!(key = %key, count = playlists.len(), "Cache hit");
                    return Ok(playlists);
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                }
            }
        }

        let playlists = self
            .store_call("get_by_owner", self.store.get_by_owner(owner_id))
            .await?;

        match serde_json::to_vec(&playlists) {
            Ok(bytes) => {
                self.cache_call(
                    "set",
                    &key,
                    self.cache.set(&key, bytes, self.settings.cache_ttl),
                )
                .await;
            }
            Err(e) => tracing::warn!(key = %key, error = %e, "Could not encode playlists for cache"),
        }

        Ok(playlists)
    }

    /// Look up a playlist by exact name
    pub async fn find_playlist_by_name(&self, name: &str) -> Result<Option<Playlist>> {
        require(name, "playlist name")?;
        self.store_call("get_by_name", self.store.get_by_name(name))
            .await
    }

    /// Append a track; a track whose id is already present is refused
    pub async fn add_track_to_playlist(
        &self,
        playlist_id: &PlaylistId,
        track: Track,
    ) -> Result<Playlist> {
        require(playlist_id.as_str(), "playlist id")?;
        require(&track.title, "track title")?;
        require(&track.artist, "track artist")?;

        let current = self.get_playlist(playlist_id).await?;
        if current.contains_track(&track) {
            return Err(PlaylistError::TrackAlreadyExists {
                playlist_id: playlist_id.to_string(),
                track_id: track.id.to_string(),
            });
        }

        self.invalidate_owner(&current.owner_id).await;
        let updated = self
            .store_call("add_track", self.store.add_track(playlist_id, track))
            .await?;

        tracing::debug!(playlist_id = %playlist_id, tracks = updated.tracks.len(), "Track added");
        Ok(updated)
    }

    /// Remove a track by id
    pub async fn remove_track_from_playlist(
        &self,
        playlist_id: &PlaylistId,
        track_id: &TrackId,
    ) -> Result<Playlist> {
        require(playlist_id.as_str(), "playlist id")?;
        require(track_id.as_str(), "track id")?;

        let current = self.get_playlist(playlist_id).await?;

        self.invalidate_owner(&current.owner_id).await;
        self.store_call(
            "remove_track",
            self.store.remove_track(playlist_id, track_id),
        )
        .await
    }

    /// Delete a playlist owned by `owner_id`
    pub async fn delete_playlist(&self, id: &PlaylistId, owner_id: &UserId) -> Result<()> {
        require(id.as_str(), "playlist id")?;
        require(owner_id.as_str(), "owner id")?;

        self.store_call("delete", self.store.delete(id, owner_id))
            .await?;

        self.invalidate_owner(owner_id).await;
        tracing::info!(playlist_id = %id, owner_id = %owner_id, "Playlist deleted");

        Ok(())
    }

    /// Rename or re-describe a playlist owned by `owner_id`
    pub async fn update_playlist(
        &self,
        id: &PlaylistId,
        owner_id: &UserId,
        changes: &PlaylistChanges,
    ) -> Result<Playlist> {
        require(id.as_str(), "playlist id")?;
        require(owner_id.as_str(), "owner id")?;
        if let FieldChange::Set(name) = &changes.name {
            require(name, "playlist name")?;
        }

        let current = self.get_playlist(id).await?;
        if !current.is_owned_by(owner_id) {
            return Err(PlaylistError::permission_denied(format!(
                "user {owner_id} does not own playlist {id}"
            )));
        }

        if changes.is_empty() {
            return Ok(current);
        }

        self.invalidate_owner(owner_id).await;
        self.store_call("update", self.store.update(id, changes))
            .await
    }
}
