/// Track domain type
use super::ids::TrackId;
use serde::{Deserialize, Serialize};

/// A track as carried inside a playlist document.
///
/// Tracks are values: a playlist owns its copies, and two playlists holding
/// the same track hold independent copies.
///
/// Field aliases accept payloads from producers that serialize with
/// capitalized field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Track identifier, empty until persisted
    #[serde(default, alias = "ID", alias = "_id")]
    pub id: TrackId,

    /// Track title
    #[serde(alias = "Title")]
    pub title: String,

    /// Artist name
    #[serde(alias = "Artist")]
    pub artist: String,

    /// Duration in seconds
    #[serde(default, alias = "Duration", alias = "duration_sec")]
    pub duration: u32,

    /// Album name
    #[serde(default, alias = "Album")]
    pub album: String,
}

impl Track {
    /// Create a track that has not been persisted yet
    pub fn new(title: impl Into<String>, artist: impl Into<String>, duration: u32) -> Self {
        Self {
            id: TrackId::default(),
            title: title.into(),
            artist: artist.into(),
            duration,
            album: String::new(),
        }
    }

    /// Set the identifier
    pub fn with_id(mut self, id: impl Into<TrackId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the album
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    /// Whether two tracks collide under the no-duplicate-id rule.
    ///
    /// Tracks without an identifier never collide.
    pub fn same_identity(&self, other: &Track) -> bool {
        !self.id.is_empty() && self.id == other.id
    }
}
