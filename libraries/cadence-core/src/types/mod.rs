mod feed;
mod ids;
mod playlist;
mod track;

pub use feed::FeedMessage;
pub use ids::{ObjectKey, PlaylistId, TrackId, UserId};
pub use playlist::{
    cache_key_for_owner, now_millis, FieldChange, Playlist, PlaylistChanges,
    USER_PLAYLISTS_PREFIX,
};
pub use track::Track;
