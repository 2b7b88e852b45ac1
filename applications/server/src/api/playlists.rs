/// Playlists API routes
use crate::{error::Result, state::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use cadence_core::{FieldChange, Playlist, PlaylistChanges, PlaylistId, Track, TrackId, UserId};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub user_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// Partial update; an absent field is left alone, `"description": null` clears it
#[derive(Debug, Deserialize)]
pub struct UpdatePlaylistRequest {
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AddTrackRequest {
    pub track: Track,
}

/// Marks a field as present even when its value is `null`
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl UpdatePlaylistRequest {
    fn changes(&self) -> PlaylistChanges {
        PlaylistChanges {
            name: self
                .name
                .clone()
                .map_or(FieldChange::Keep, FieldChange::Set),
            description: self
                .description
                .clone()
                .map_or(FieldChange::Keep, FieldChange::Set),
        }
    }
}

/// POST /api/playlists
/// Create a new playlist
pub async fn create_playlist(
    State(app_state): State<AppState>,
    Json(req): Json<CreatePlaylistRequest>,
) -> Result<(StatusCode, Json<Playlist>)> {
    let playlist = app_state
        .playlists
        .create_playlist(
            &req.name,
            &UserId::new(req.user_id),
            req.description,
            req.tracks,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(playlist)))
}

/// GET /api/playlists/:id
/// Get playlist details with tracks
pub async fn get_playlist(
    Path(id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Json<Playlist>> {
    let playlist = app_state
        .playlists
        .get_playlist(&PlaylistId::new(id))
        .await?;
    Ok(Json(playlist))
}

/// PUT /api/playlists/:id
/// Rename or re-describe a playlist
pub async fn update_playlist(
    Path(id): Path<String>,
    State(app_state): State<AppState>,
    Json(req): Json<UpdatePlaylistRequest>,
) -> Result<Json<Playlist>> {
    let playlist = app_state
        .playlists
        .update_playlist(
            &PlaylistId::new(id),
            &UserId::new(req.user_id.clone()),
            &req.changes(),
        )
        .await?;
    Ok(Json(playlist))
}

/// DELETE /api/playlists/:id?user_id=
/// Delete a playlist
pub async fn delete_playlist(
    Path(id): Path<String>,
    Query(owner): Query<OwnerQuery>,
    State(app_state): State<AppState>,
) -> Result<StatusCode> {
    app_state
        .playlists
        .delete_playlist(&PlaylistId::new(id), &UserId::new(owner.user_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/:user_id/playlists
/// All playlists owned by a user
pub async fn list_user_playlists(
    Path(user_id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Playlist>>> {
    let playlists = app_state
        .playlists
        .get_user_playlists(&UserId::new(user_id))
        .await?;
    Ok(Json(playlists))
}

/// POST /api/playlists/:id/tracks
/// Add a track to a playlist
pub async fn add_track_to_playlist(
    Path(id): Path<String>,
    State(app_state): State<AppState>,
    Json(req): Json<AddTrackRequest>,
) -> Result<Json<Playlist>> {
    let playlist = app_state
        .playlists
        .add_track_to_playlist(&PlaylistId::new(id), req.track)
        .await?;
    Ok(Json(playlist))
}

/// DELETE /api/playlists/:id/tracks/:track_id
/// Remove a track from a playlist
pub async fn remove_track_from_playlist(
    Path((id, track_id)): Path<(String, String)>,
    State(app_state): State<AppState>,
) -> Result<Json<Playlist>> {
    let playlist = app_state
        .playlists
        .remove_track_from_playlist(&PlaylistId::new(id), &TrackId::new(track_id))
        .await?;
    Ok(Json(playlist))
}
