/// Storage-specific errors
use cadence_core::PlaylistError;
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Playlist not found under either identifier encoding
    #[error("Playlist not found: {0}")]
    PlaylistNotFound(String),

    /// Track not present in the playlist document
    #[error("Track {track_id} not found in playlist {playlist_id}")]
    TrackNotFound {
        playlist_id: String,
        track_id: String,
    },

    /// Track id already present in the playlist document
    #[error("Track {track_id} already exists in playlist {playlist_id}")]
    DuplicateTrack {
        playlist_id: String,
        track_id: String,
    },

    /// Ownership check failed
    #[error("User {user_id} does not own playlist {playlist_id}")]
    NotOwner {
        playlist_id: String,
        user_id: String,
    },

    /// Document violates an invariant before it reaches the database
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Stored document could not be decoded
    #[error("Corrupt document {id}: {reason}")]
    CorruptDocument { id: String, reason: String },

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Serialization/deserialization error
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<StorageError> for PlaylistError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::PlaylistNotFound(id) => PlaylistError::PlaylistNotFound(id),
            StorageError::TrackNotFound {
                playlist_id,
                track_id,
            } => PlaylistError::TrackNotFound {
                playlist_id,
                track_id,
            },
            StorageError::DuplicateTrack {
                playlist_id,
                track_id,
            } => PlaylistError::TrackAlreadyExists {
                playlist_id,
                track_id,
            },
            StorageError::NotOwner {
                playlist_id,
                user_id,
            } => PlaylistError::permission_denied(format!(
                "user {user_id} does not own playlist {playlist_id}"
            )),
            StorageError::InvalidDocument(msg) => PlaylistError::InvalidArgument(msg),
            StorageError::Database(sqlx::Error::RowNotFound) => {
                PlaylistError::playlist_not_found("row not found")
            }
            other => PlaylistError::storage(other.to_string()),
        }
    }
}
