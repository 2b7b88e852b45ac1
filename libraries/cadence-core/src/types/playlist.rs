//! Playlist aggregate and its change set

use super::ids::{PlaylistId, TrackId, UserId};
use super::track::Track;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of the cache key holding an owner's playlist list
pub const USER_PLAYLISTS_PREFIX: &str = "user_playlists:";

/// Cache key for the list of playlists owned by `owner_id`
pub fn cache_key_for_owner(owner_id: &UserId) -> String {
    format!("{USER_PLAYLISTS_PREFIX}{owner_id}")
}

/// Current time truncated to the millisecond precision the store keeps
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Playlist aggregate root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    /// Assigned on first persistence, empty before
    pub id: PlaylistId,
    pub name: String,
    pub owner_id: UserId,
    pub description: Option<String>,

    /// Tracks in insertion order
    pub tracks: Vec<Track>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Playlist {
    /// Create an unsaved playlist; the store assigns id and timestamps
    pub fn draft(name: impl Into<String>, owner_id: UserId) -> Self {
        let now = now_millis();
        Self {
            id: PlaylistId::default(),
            name: name.into(),
            owner_id,
            description: None,
            tracks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Set the initial tracks
    pub fn with_tracks(mut self, tracks: Vec<Track>) -> Self {
        self.tracks = tracks;
        self
    }

    /// Whether `user_id` owns this playlist
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }

    /// Whether adding `track` would break the unique-id invariant
    pub fn contains_track(&self, track: &Track) -> bool {
        self.tracks.iter().any(|t| t.same_identity(track))
    }

    /// First non-empty track id that appears more than once, if any
    pub fn duplicate_track_id(&self) -> Option<&TrackId> {
        self.tracks.iter().enumerate().find_map(|(i, track)| {
            self.tracks[..i]
                .iter()
                .any(|earlier| earlier.same_identity(track))
                .then_some(&track.id)
        })
    }
}

/// One field of a partial update.
///
/// `Keep` leaves the stored value alone; `Set` writes the value even when it
/// is empty, zero, or `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldChange<T> {
    #[default]
    Keep,
    Set(T),
}

impl<T> FieldChange<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, FieldChange::Set(_))
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            FieldChange::Set(value) => Some(value),
            FieldChange::Keep => None,
        }
    }
}

/// Rename/describe change set for a playlist
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistChanges {
    pub name: FieldChange<String>,
    pub description: FieldChange<Option<String>>,
}

impl PlaylistChanges {
    /// Change only the name
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: FieldChange::Set(name.into()),
            ..Self::default()
        }
    }

    /// Change only the description (`None` clears it)
    pub fn describe(description: Option<String>) -> Self {
        Self {
            description: FieldChange::Set(description),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.name.is_set() && !self.description.is_set()
    }
}
