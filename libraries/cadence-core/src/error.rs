/// Core error types for Cadence
use thiserror::Error;

/// Result type alias using `PlaylistError`
pub type Result<T> = std::result::Result<T, PlaylistError>;

/// Caller-visible classification of a failure.
///
/// Every public playlist operation fails with exactly one of these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required field was empty or malformed; fixable by the caller
    InvalidArgument,
    /// The referenced playlist or track does not exist
    NotFound,
    /// The caller does not own the playlist
    PermissionDenied,
    /// The track is already part of the playlist
    AlreadyExists,
    /// Store or cache backend failure, including timeouts
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NotFound => "not_found",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Core error type for Cadence
#[derive(Error, Debug)]
pub enum PlaylistError {
    /// Invalid input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Playlist not found
    #[error("Playlist not found: {0}")]
    PlaylistNotFound(String),

    /// Track not found inside a playlist
    #[error("Track {track_id} not found in playlist {playlist_id}")]
    TrackNotFound {
        playlist_id: String,
        track_id: String,
    },

    /// Permission denied with context
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Duplicate track in a playlist
    #[error("Track {track_id} already exists in playlist {playlist_id}")]
    TrackAlreadyExists {
        playlist_id: String,
        track_id: String,
    },

    /// A backend call exceeded its deadline
    #[error("Operation timed out: {operation}")]
    Timeout { operation: &'static str },

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Cache-related errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Event feed errors
    #[error("Feed error: {0}")]
    Feed(String),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl PlaylistError {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a playlist not found error
    pub fn playlist_not_found(id: impl Into<String>) -> Self {
        Self::PlaylistNotFound(id.into())
    }

    /// Create a permission denied error
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a cache error
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Create a feed error
    pub fn feed(msg: impl Into<String>) -> Self {
        Self::Feed(msg.into())
    }

    /// Classify this error into the caller-visible taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::PlaylistNotFound(_) | Self::TrackNotFound { .. } => ErrorKind::NotFound,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::TrackAlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::Timeout { .. }
            | Self::Storage(_)
            | Self::Cache(_)
            | Self::Feed(_)
            | Self::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Whether retrying the same call could succeed
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Internal
    }
}
