use crate::playlists;
use async_trait::async_trait;
use cadence_core::{
    error::Result,
    storage::PlaylistStore,
    types::{Playlist, PlaylistChanges, PlaylistId, Track, TrackId, UserId},
    PlaylistError,
};
use sqlx::SqlitePool;

/// Playlist store backed by `SQLite`
#[derive(Clone)]
pub struct SqlitePlaylistStore {
    pool: SqlitePool,
}

impl SqlitePlaylistStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlaylistStore for SqlitePlaylistStore {
    async fn create(&self, playlist: Playlist) -> Result<Playlist> {
        Ok(playlists::create(&self.pool, playlist).await?)
    }

    async fn get_by_id(&self, id: &PlaylistId) -> Result<Playlist> {
        playlists::get_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| PlaylistError::playlist_not_found(id.as_str()))
    }

    async fn get_by_owner(&self, owner_id: &UserId) -> Result<Vec<Playlist>> {
        Ok(playlists::get_by_owner(&self.pool, owner_id).await?)
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Playlist>> {
        Ok(playlists::get_by_name(&self.pool, name).await?)
    }

    async fn update(&self, id: &PlaylistId, changes: &PlaylistChanges) -> Result<Playlist> {
        Ok(playlists::update(&self.pool, id, changes).await?)
    }

    async fn add_track(&self, playlist_id: &PlaylistId, track: Track) -> Result<Playlist> {
        Ok(playlists::add_track(&self.pool, playlist_id, track).await?)
    }

    async fn remove_track(
        &self,
        playlist_id: &PlaylistId,
        track_id: &TrackId,
    ) -> Result<Playlist> {
        Ok(playlists::remove_track(&self.pool, playlist_id, track_id).await?)
    }

    async fn delete(&self, id: &PlaylistId, owner_id: &UserId) -> Result<()> {
        Ok(playlists::delete(&self.pool, id, owner_id).await?)
    }
}
