//! Playlist documents
//!
//! One row per playlist; the ordered track list lives in the `tracks` JSON
//! column so that every mutation is a single-row statement. Track append and
//! removal are expressed with SQLite's JSON functions, which makes the
//! duplicate check and the write one atomic step.
//!
//! # Identifier encodings
//!
//! Playlists written by this crate are keyed by an opaque string (`id`).
//! Historic records were keyed by a 12-byte structured key (`object_key`)
//! whose public form is 24 hex chars. Lookups go through [`IdResolution`],
//! which tries the opaque form first and then the structured form. If the
//! table is ever rebuilt, backfilling `id` from `hex(object_key)` removes the
//! need for the second stage.

use crate::error::{Result, StorageError};
use cadence_core::types::{
    now_millis, ObjectKey, Playlist, PlaylistChanges, PlaylistId, Track, TrackId, UserId,
};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

macro_rules! select_playlists {
    ($tail:literal) => {
        concat!(
            "SELECT pk, id, object_key, name, owner_id, description, tracks, created_at, updated_at ",
            "FROM playlists ",
            $tail
        )
    };
}

/// One stage of identifier resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdResolution {
    /// Match the opaque string key
    Opaque(String),
    /// Match the structured binary key
    Structured(ObjectKey),
}

impl IdResolution {
    /// Lookup stages for `id`, in the order they are tried.
    ///
    /// The structured stage only exists when `id` is 24 hex chars.
    pub fn stages(id: &PlaylistId) -> Vec<IdResolution> {
        let mut stages = vec![IdResolution::Opaque(id.as_str().to_string())];
        if let Some(key) = ObjectKey::parse_hex(id.as_str()) {
            stages.push(IdResolution::Structured(key));
        }
        stages
    }
}

/// Stored row: internal primary key plus the decoded document
struct Located {
    pk: i64,
    playlist: Playlist,
}

fn timestamp(millis: i64, id: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| StorageError::CorruptDocument {
        id: id.to_string(),
        reason: format!("timestamp out of range: {millis}"),
    })
}

fn decode_row(row: &SqliteRow) -> Result<Located> {
    let pk: i64 = row.try_get("pk")?;
    let id: Option<String> = row.try_get("id")?;
    let object_key: Option<Vec<u8>> = row.try_get("object_key")?;

    let public_id = match (id, object_key) {
        (Some(id), _) => id,
        (None, Some(bytes)) => {
            let bytes: [u8; 12] =
                bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StorageError::CorruptDocument {
                        id: format!("pk {pk}"),
                        reason: format!("object key has {} bytes", bytes.len()),
                    })?;
            ObjectKey::from_bytes(bytes).to_hex()
        }
        (None, None) => {
            return Err(StorageError::CorruptDocument {
                id: format!("pk {pk}"),
                reason: "row has no identifier".to_string(),
            })
        }
    };

    let tracks_json: String = row.try_get("tracks")?;
    let tracks: Vec<Track> =
        serde_json::from_str(&tracks_json).map_err(|e| StorageError::CorruptDocument {
            id: public_id.clone(),
            reason: e.to_string(),
        })?;

    let created_at = timestamp(row.try_get("created_at")?, &public_id)?;
    let updated_at = timestamp(row.try_get("updated_at")?, &public_id)?;

    Ok(Located {
        pk,
        playlist: Playlist {
            id: PlaylistId::new(public_id),
            name: row.try_get("name")?,
            owner_id: UserId::new(row.try_get::<String, _>("owner_id")?),
            description: row.try_get("description")?,
            tracks,
            created_at,
            updated_at,
        },
    })
}

async fn fetch_stage(pool: &SqlitePool, stage: &IdResolution) -> Result<Option<Located>> {
    let row = match stage {
        IdResolution::Opaque(id) => {
            sqlx::query(select_playlists!("WHERE id = ?"))
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
        IdResolution::Structured(key) => {
            sqlx::query(select_playlists!("WHERE object_key = ?"))
                .bind(&key.as_bytes()[..])
                .fetch_optional(pool)
                .await?
        }
    };

    row.as_ref().map(decode_row).transpose()
}

async fn locate(pool: &SqlitePool, id: &PlaylistId) -> Result<Option<Located>> {
    for stage in IdResolution::stages(id) {
        if let Some(found) = fetch_stage(pool, &stage).await? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

async fn locate_required(pool: &SqlitePool, id: &PlaylistId) -> Result<Located> {
    locate(pool, id)
        .await?
        .ok_or_else(|| StorageError::PlaylistNotFound(id.to_string()))
}

async fn fetch_by_pk(pool: &SqlitePool, pk: i64) -> Result<Option<Playlist>> {
    let row = sqlx::query(select_playlists!("WHERE pk = ?"))
        .bind(pk)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(decode_row).transpose()?.map(|l| l.playlist))
}

fn assign_track_ids(tracks: &mut [Track]) {
    for track in tracks.iter_mut().filter(|t| t.id.is_empty()) {
        track.id = TrackId::generate();
    }
}

fn validate_document(playlist: &Playlist) -> Result<()> {
    if playlist.name.is_empty() {
        return Err(StorageError::InvalidDocument(
            "playlist name cannot be empty".to_string(),
        ));
    }
    if playlist.owner_id.is_empty() {
        return Err(StorageError::InvalidDocument(
            "owner id cannot be empty".to_string(),
        ));
    }
    if let Some(dup) = playlist.duplicate_track_id() {
        return Err(StorageError::InvalidDocument(format!(
            "track {dup} appears more than once"
        )));
    }
    Ok(())
}

/// Create a new playlist.
///
/// Assigns a generated id when the draft has none and generated ids to any
/// track without one; stamps `created_at == updated_at` with the
/// persistence time.
pub async fn create(pool: &SqlitePool, mut playlist: Playlist) -> Result<Playlist> {
    if playlist.id.is_empty() {
        playlist.id = PlaylistId::generate();
    }
    assign_track_ids(&mut playlist.tracks);
    validate_document(&playlist)?;

    let now = now_millis();
    playlist.created_at = now;
    playlist.updated_at = now;

    sqlx::query(
        r#"
        INSERT INTO playlists (id, name, owner_id, description, tracks, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(playlist.id.as_str())
    .bind(&playlist.name)
    .bind(playlist.owner_id.as_str())
    .bind(&playlist.description)
    .bind(serde_json::to_string(&playlist.tracks)?)
    .bind(now.timestamp_millis())
    .bind(now.timestamp_millis())
    .execute(pool)
    .await?;

    tracing::debug!(playlist_id = %playlist.id, owner_id = %playlist.owner_id, "Playlist created");

    Ok(playlist)
}

/// Insert a record keyed only by a structured key.
///
/// Used when importing records from the historic store, which addressed
/// playlists by binary key. The returned playlist's id is the key's hex form.
pub async fn import_structured(
    pool: &SqlitePool,
    key: ObjectKey,
    mut playlist: Playlist,
) -> Result<Playlist> {
    playlist.id = PlaylistId::new(key.to_hex());
    validate_document(&playlist)?;
    if playlist.updated_at < playlist.created_at {
        playlist.updated_at = playlist.created_at;
    }

    sqlx::query(
        r#"
        INSERT INTO playlists (object_key, name, owner_id, description, tracks, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&key.as_bytes()[..])
    .bind(&playlist.name)
    .bind(playlist.owner_id.as_str())
    .bind(&playlist.description)
    .bind(serde_json::to_string(&playlist.tracks)?)
    .bind(playlist.created_at.timestamp_millis())
    .bind(playlist.updated_at.timestamp_millis())
    .execute(pool)
    .await?;

    Ok(playlist)
}

/// Get playlist by ID, trying both identifier encodings
pub async fn get_by_id(pool: &SqlitePool, id: &PlaylistId) -> Result<Option<Playlist>> {
    Ok(locate(pool, id).await?.map(|l| l.playlist))
}

/// Get all playlists owned by a user, oldest first
pub async fn get_by_owner(pool: &SqlitePool, owner_id: &UserId) -> Result<Vec<Playlist>> {
    let rows = sqlx::query(select_playlists!(
        "WHERE owner_id = ? ORDER BY created_at, pk"
    ))
    .bind(owner_id.as_str())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| decode_row(row).map(|l| l.playlist))
        .collect()
}

/// Get the oldest playlist with exactly this name
pub async fn get_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Playlist>> {
    let row = sqlx::query(select_playlists!(
        "WHERE name = ? ORDER BY created_at, pk LIMIT 1"
    ))
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(decode_row).transpose()?.map(|l| l.playlist))
}

/// Apply a rename/describe change set to an existing playlist.
///
/// Only fields marked `Set` are written, in one UPDATE that never touches the
/// track list, so appends racing with a rename are preserved. Identifier,
/// owner and `created_at` are never written.
pub async fn update(
    pool: &SqlitePool,
    id: &PlaylistId,
    changes: &PlaylistChanges,
) -> Result<Playlist> {
    if changes.name.as_set().is_some_and(String::is_empty) {
        return Err(StorageError::InvalidDocument(
            "playlist name cannot be empty".to_string(),
        ));
    }

    let located = locate_required(pool, id).await?;
    if changes.is_empty() {
        return Ok(located.playlist);
    }

    let result = sqlx::query(
        r#"
        UPDATE playlists
        SET name = CASE WHEN ?1 THEN ?2 ELSE name END,
            description = CASE WHEN ?3 THEN ?4 ELSE description END,
            updated_at = MAX(created_at, ?5)
        WHERE pk = ?6
        "#,
    )
    .bind(changes.name.is_set())
    .bind(changes.name.as_set().cloned())
    .bind(changes.description.is_set())
    .bind(changes.description.as_set().cloned().flatten())
    .bind(now_millis().timestamp_millis())
    .bind(located.pk)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::PlaylistNotFound(id.to_string()));
    }

    tracing::debug!(playlist_id = %id, "Playlist updated");

    fetch_by_pk(pool, located.pk)
        .await?
        .ok_or_else(|| StorageError::PlaylistNotFound(id.to_string()))
}

/// Append a track to a playlist.
///
/// The duplicate check runs inside the UPDATE, so two concurrent appends of
/// the same track id cannot both succeed.
pub async fn add_track(
    pool: &SqlitePool,
    playlist_id: &PlaylistId,
    mut track: Track,
) -> Result<Playlist> {
    if track.id.is_empty() {
        track.id = TrackId::generate();
    }

    let located = locate_required(pool, playlist_id).await?;

    let result = sqlx::query(
        r#"
        UPDATE playlists
        SET tracks = json_insert(tracks, '$[#]', json(?)),
            updated_at = MAX(created_at, ?)
        WHERE pk = ?
          AND NOT EXISTS (
              SELECT 1 FROM json_each(playlists.tracks)
              WHERE json_extract(json_each.value, '$.id') = ?
          )
        "#,
    )
    .bind(serde_json::to_string(&track)?)
    .bind(now_millis().timestamp_millis())
    .bind(located.pk)
    .bind(track.id.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return match fetch_by_pk(pool, located.pk).await? {
            Some(_) => Err(StorageError::DuplicateTrack {
                playlist_id: playlist_id.to_string(),
                track_id: track.id.to_string(),
            }),
            None => Err(StorageError::PlaylistNotFound(playlist_id.to_string())),
        };
    }

    tracing::debug!(playlist_id = %playlist_id, track_id = %track.id, "Track appended");

    fetch_by_pk(pool, located.pk)
        .await?
        .ok_or_else(|| StorageError::PlaylistNotFound(playlist_id.to_string()))
}

/// Remove a track from a playlist, keeping the order of the others
pub async fn remove_track(
    pool: &SqlitePool,
    playlist_id: &PlaylistId,
    track_id: &TrackId,
) -> Result<Playlist> {
    let located = locate_required(pool, playlist_id).await?;

    let result = sqlx::query(
        r#"
        UPDATE playlists
        SET tracks = (
                SELECT json_group_array(json(kept.value))
                FROM (
                    SELECT value FROM json_each(playlists.tracks)
                    WHERE json_extract(value, '$.id') IS NOT ?1
                    ORDER BY key
                ) AS kept
            ),
            updated_at = MAX(created_at, ?2)
        WHERE pk = ?3
          AND EXISTS (
              SELECT 1 FROM json_each(playlists.tracks)
              WHERE json_extract(json_each.value, '$.id') = ?1
          )
        "#,
    )
    .bind(track_id.as_str())
    .bind(now_millis().timestamp_millis())
    .bind(located.pk)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return match fetch_by_pk(pool, located.pk).await? {
            Some(_) => Err(StorageError::TrackNotFound {
                playlist_id: playlist_id.to_string(),
                track_id: track_id.to_string(),
            }),
            None => Err(StorageError::PlaylistNotFound(playlist_id.to_string())),
        };
    }

    tracing::debug!(playlist_id = %playlist_id, track_id = %track_id, "Track removed");

    fetch_by_pk(pool, located.pk)
        .await?
        .ok_or_else(|| StorageError::PlaylistNotFound(playlist_id.to_string()))
}

/// Delete playlist after checking ownership
pub async fn delete(pool: &SqlitePool, id: &PlaylistId, owner_id: &UserId) -> Result<()> {
    let located = locate_required(pool, id).await?;

    if !located.playlist.is_owned_by(owner_id) {
        return Err(StorageError::NotOwner {
            playlist_id: id.to_string(),
            user_id: owner_id.to_string(),
        });
    }

    let result = sqlx::query("DELETE FROM playlists WHERE pk = ? AND owner_id = ?")
        .bind(located.pk)
        .bind(owner_id.as_str())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::PlaylistNotFound(id.to_string()));
    }

    tracing::debug!(playlist_id = %id, owner_id = %owner_id, "Playlist deleted");

    Ok(())
}
