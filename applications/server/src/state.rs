/// Shared application state
use crate::services::PlaylistService;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub playlists: PlaylistService,
}

impl AppState {
    pub fn new(playlists: PlaylistService) -> Self {
        Self { playlists }
    }
}
