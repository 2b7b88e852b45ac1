/// Service layer
pub mod playlists;

pub use playlists::{PlaylistService, ServiceSettings};
