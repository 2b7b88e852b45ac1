//! Playlist service behaviour: validation, cache discipline, ownership
mod common;

use cadence_core::{
    ErrorKind, FieldChange, PlaylistChanges, PlaylistError, PlaylistId, Track, TrackId, UserId,
};
use cadence_server::{PlaylistService, ServiceSettings};
use common::{
    track, BrokenCache, CacheWatchingStore, Harness, InterleavingStore, StalledStore,
};
use std::sync::Arc;

fn u(id: &str) -> UserId {
    UserId::new(id)
}

#[tokio::test]
async fn test_create_then_get_round_trips() {
    let h = Harness::new().await;

    let created = h
        .service
        .create_playlist(
            "Morning",
            &u("u1"),
            Some("coffee".to_string()),
            vec![track("t1", "A")],
        )
        .await
        .unwrap();

    let fetched = h.service.get_playlist(&created.id).await.unwrap();
    assert_eq!(fetched.name, "Morning");
    assert_eq!(fetched.owner_id, u("u1"));
    assert_eq!(fetched.tracks, created.tracks);
    assert_eq!(fetched.created_at, fetched.updated_at);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_empty_name_or_owner_is_rejected_without_writes() {
    let h = Harness::new().await;

    let no_name = h
        .service
        .create_playlist("", &u("u1"), None, vec![])
        .await
        .unwrap_err();
    assert_eq!(no_name.kind(), ErrorKind::InvalidArgument);

    let no_owner = h
        .service
        .create_playlist("name", &u(""), None, vec![])
        .await
        .unwrap_err();
    assert_eq!(no_owner.kind(), ErrorKind::InvalidArgument);

    assert_eq!(h.store.mutations(), 0);
}

#[tokio::test]
async fn test_empty_ids_are_rejected() {
    let h = Harness::new().await;
    let empty = PlaylistId::default();

    let cases = [
        h.service.get_playlist(&empty).await.map(|_| ()),
        h.service.get_user_playlists(&u("")).await.map(|_| ()),
        h.service
            .add_track_to_playlist(&empty, track("t1", "A"))
            .await
            .map(|_| ()),
        h.service
            .remove_track_from_playlist(&PlaylistId::new("p"), &TrackId::default())
            .await
            .map(|_| ()),
        h.service.delete_playlist(&empty, &u("u1")).await,
    ];

    for result in cases {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);
    }
    assert_eq!(h.store.mutations(), 0);
}

#[tokio::test]
async fn test_track_requires_title_and_artist() {
    let h = Harness::new().await;
    let playlist = h
        .service
        .create_playlist("P", &u("u1"), None, vec![])
        .await
        .unwrap();

    let no_artist = Track::new("Song", "", 10);
    let err = h
        .service
        .add_track_to_playlist(&playlist.id, no_artist)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[tokio::test]
async fn test_second_owner_read_is_served_from_cache() {
    let h = Harness::new().await;
    h.service
        .create_playlist("A", &u("u1"), None, vec![])
        .await
        .unwrap();

    let first = h.service.get_user_playlists(&u("u1")).await.unwrap();
    assert_eq!(h.store.owner_queries(), 1);
    assert!(h.is_cached("u1").await);

    let second = h.service.get_user_playlists(&u("u1")).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(h.store.owner_queries(), 1);
}

#[tokio::test]
async fn test_owner_with_no_playlists_gets_empty_list() {
    let h = Harness::new().await;
    let playlists = h.service.get_user_playlists(&u("nobody")).await.unwrap();
    assert!(playlists.is_empty());
}

#[tokio::test]
async fn test_mutations_invalidate_owner_cache() {
    let h = Harness::new().await;

    let playlist = h
        .service
        .create_playlist("P", &u("u1"), None, vec![])
        .await
        .unwrap();
    assert!(!h.is_cached("u1").await);

    h.service.get_user_playlists(&u("u1")).await.unwrap();
    assert!(h.is_cached("u1").await);
    h.service
        .add_track_to_playlist(&playlist.id, track("t1", "A"))
        .await
        .unwrap();
    assert!(!h.is_cached("u1").await);

    let listed = h.service.get_user_playlists(&u("u1")).await.unwrap();
    assert_eq!(listed[0].tracks.len(), 1);
    assert!(h.is_cached("u1").await);

    h.service
        .remove_track_from_playlist(&playlist.id, &TrackId::new("t1"))
        .await
        .unwrap();
    assert!(!h.is_cached("u1").await);

    h.service.get_user_playlists(&u("u1")).await.unwrap();
    h.service
        .update_playlist(&playlist.id, &u("u1"), &PlaylistChanges::rename("Renamed"))
        .await
        .unwrap();
    assert!(!h.is_cached("u1").await);

    h.service.get_user_playlists(&u("u1")).await.unwrap();
    h.service
        .delete_playlist(&playlist.id, &u("u1"))
        .await
        .unwrap();
    assert!(!h.is_cached("u1").await);
    assert!(h.service.get_user_playlists(&u("u1")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cache_is_dropped_before_store_mutation() {
    let db = common::TestDb::new().await;
    let cache = Arc::new(cadence_cache::MemoryCache::new(16).unwrap());
    let store = Arc::new(CacheWatchingStore::new(
        Arc::new(cadence_storage::SqlitePlaylistStore::new(db.pool.clone())),
        cache.clone(),
        "u1",
    ));
    let service = PlaylistService::new(store.clone(), cache, ServiceSettings::default());

    let playlist = service
        .create_playlist("P", &u("u1"), None, vec![])
        .await
        .unwrap();

    service.get_user_playlists(&u("u1")).await.unwrap();
    service
        .add_track_to_playlist(&playlist.id, track("t1", "A"))
        .await
        .unwrap();

    service.get_user_playlists(&u("u1")).await.unwrap();
    service
        .remove_track_from_playlist(&playlist.id, &TrackId::new("t1"))
        .await
        .unwrap();

    service.get_user_playlists(&u("u1")).await.unwrap();
    service
        .update_playlist(&playlist.id, &u("u1"), &PlaylistChanges::rename("Q"))
        .await
        .unwrap();

    assert_eq!(
        store.seen(),
        vec![("add_track", false), ("remove_track", false), ("update", false)]
    );
}

#[tokio::test]
async fn test_failed_track_removal_still_drops_cache() {
    let h = Harness::new().await;
    let playlist = h
        .service
        .create_playlist("P", &u("u1"), None, vec![track("t1", "A")])
        .await
        .unwrap();
    h.service.get_user_playlists(&u("u1")).await.unwrap();
    assert!(h.is_cached("u1").await);

    let err = h
        .service
        .remove_track_from_playlist(&playlist.id, &TrackId::new("t2"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!h.is_cached("u1").await);
}

#[tokio::test]
async fn test_rename_keeps_track_appended_concurrently() {
    let db = common::TestDb::new().await;
    let store = Arc::new(InterleavingStore::new(
        Arc::new(cadence_storage::SqlitePlaylistStore::new(db.pool.clone())),
        track("t_new", "Fresh"),
    ));
    let service = PlaylistService::new(
        store,
        Arc::new(cadence_cache::NoopCache),
        ServiceSettings::default(),
    );

    let playlist = service
        .create_playlist("Новинки", &u("system"), None, vec![])
        .await
        .unwrap();

    let renamed = service
        .update_playlist(&playlist.id, &u("system"), &PlaylistChanges::rename("New"))
        .await
        .unwrap();
    assert_eq!(renamed.name, "New");
    assert_eq!(renamed.tracks.len(), 1);

    let stored = service.get_playlist(&playlist.id).await.unwrap();
    assert_eq!(stored.name, "New");
    assert_eq!(stored.tracks.len(), 1);
    assert_eq!(stored.tracks[0].id, TrackId::new("t_new"));
}

#[tokio::test]
async fn test_failed_delete_keeps_cache() {
    let h = Harness::new().await;
    let playlist = h
        .service
        .create_playlist("P", &u("u1"), None, vec![])
        .await
        .unwrap();
    h.service.get_user_playlists(&u("u1")).await.unwrap();

    let err = h
        .service
        .delete_playlist(&playlist.id, &u("u2"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert!(h.is_cached("u1").await);
}

#[tokio::test]
async fn test_duplicate_track_rejected_and_count_unchanged() {
    let h = Harness::new().await;
    let playlist = h
        .service
        .create_playlist("P", &u("u1"), None, vec![])
        .await
        .unwrap();

    h.service
        .add_track_to_playlist(&playlist.id, track("t1", "A"))
        .await
        .unwrap();
    let err = h
        .service
        .add_track_to_playlist(&playlist.id, track("t1", "A"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let stored = h.service.get_playlist(&playlist.id).await.unwrap();
    assert_eq!(stored.tracks.len(), 1);
}

#[tokio::test]
async fn test_tracks_without_id_are_never_duplicates() {
    let h = Harness::new().await;
    let playlist = h
        .service
        .create_playlist("P", &u("u1"), None, vec![])
        .await
        .unwrap();

    for _ in 0..2 {
        h.service
            .add_track_to_playlist(&playlist.id, Track::new("Same", "Band", 10))
            .await
            .unwrap();
    }

    let stored = h.service.get_playlist(&playlist.id).await.unwrap();
    assert_eq!(stored.tracks.len(), 2);
    assert_ne!(stored.tracks[0].id, stored.tracks[1].id);
}

#[tokio::test]
async fn test_add_to_missing_playlist_is_not_found() {
    let h = Harness::new().await;
    let err = h
        .service
        .add_track_to_playlist(&PlaylistId::new("missing"), track("t1", "A"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_remove_missing_track_is_not_found() {
    let h = Harness::new().await;
    let playlist = h
        .service
        .create_playlist("P", &u("u1"), None, vec![track("t1", "A")])
        .await
        .unwrap();

    let err = h
        .service
        .remove_track_from_playlist(&playlist.id, &TrackId::new("t2"))
        .await
        .unwrap_err();
    assert!(matches!(err, PlaylistError::TrackNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_delete_by_non_owner_is_denied() {
    let h = Harness::new().await;
    let playlist = h
        .service
        .create_playlist("Mine", &u("u1"), None, vec![track("t1", "A")])
        .await
        .unwrap();

    let err = h
        .service
        .delete_playlist(&playlist.id, &u("u2"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let still_there = h.service.get_playlist(&playlist.id).await.unwrap();
    assert_eq!(still_there, playlist);
}

#[tokio::test]
async fn test_update_checks_owner_and_preserves_identity() {
    let h = Harness::new().await;
    let playlist = h
        .service
        .create_playlist(
            "Old",
            &u("u1"),
            Some("desc".to_string()),
            vec![track("t1", "A")],
        )
        .await
        .unwrap();

    let denied = h
        .service
        .update_playlist(&playlist.id, &u("u2"), &PlaylistChanges::rename("Hijacked"))
        .await
        .unwrap_err();
    assert_eq!(denied.kind(), ErrorKind::PermissionDenied);

    let changes = PlaylistChanges {
        name: FieldChange::Set("New".to_string()),
        description: FieldChange::Set(None),
    };
    let updated = h
        .service
        .update_playlist(&playlist.id, &u("u1"), &changes)
        .await
        .unwrap();

    assert_eq!(updated.id, playlist.id);
    assert_eq!(updated.name, "New");
    assert_eq!(updated.description, None);
    assert_eq!(updated.tracks, playlist.tracks);
    assert_eq!(updated.created_at, playlist.created_at);
    assert!(updated.updated_at >= updated.created_at);
}

#[tokio::test]
async fn test_update_rejects_empty_name() {
    let h = Harness::new().await;
    let playlist = h
        .service
        .create_playlist("P", &u("u1"), None, vec![])
        .await
        .unwrap();

    let err = h
        .service
        .update_playlist(&playlist.id, &u("u1"), &PlaylistChanges::rename(""))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(h.store.writes.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_road_trip_scenario() {
    let h = Harness::new().await;

    let p1 = h
        .service
        .create_playlist("Road Trip", &u("u1"), None, vec![])
        .await
        .unwrap();

    let after_add = h
        .service
        .add_track_to_playlist(&p1.id, Track::new("Song A", "Band X", 180))
        .await
        .unwrap();
    assert_eq!(after_add.tracks.len(), 1);
    let generated = after_add.tracks[0].clone();
    assert!(!generated.id.is_empty());

    let again = h
        .service
        .add_track_to_playlist(&p1.id, generated)
        .await
        .unwrap_err();
    assert_eq!(again.kind(), ErrorKind::AlreadyExists);

    let listed = h.service.get_user_playlists(&u("u1")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, p1.id);
    assert_eq!(listed[0].tracks.len(), 1);
}

#[tokio::test]
async fn test_broken_cache_degrades_to_store() {
    let db = common::TestDb::new().await;
    let service = PlaylistService::new(
        Arc::new(cadence_storage::SqlitePlaylistStore::new(db.pool.clone())),
        Arc::new(BrokenCache),
        ServiceSettings::default(),
    );

    let playlist = service
        .create_playlist("P", &u("u1"), None, vec![])
        .await
        .unwrap();
    service
        .add_track_to_playlist(&playlist.id, track("t1", "A"))
        .await
        .unwrap();

    let listed = service.get_user_playlists(&u("u1")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].tracks.len(), 1);

    service.delete_playlist(&playlist.id, &u("u1")).await.unwrap();
}

#[tokio::test]
async fn test_undecodable_cache_entry_falls_back_to_store() {
    let h = Harness::new().await;
    h.service
        .create_playlist("P", &u("u1"), None, vec![])
        .await
        .unwrap();

    use cadence_core::PlaylistCache;
    h.cache
        .set(
            "user_playlists:u1",
            b"not json".to_vec(),
            std::time::Duration::from_secs(60),
        )
        .await
        .unwrap();

    let listed = h.service.get_user_playlists(&u("u1")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(h.store.owner_queries(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_store_timeout_is_distinguishable() {
    let service = PlaylistService::new(
        Arc::new(StalledStore),
        Arc::new(cadence_cache::NoopCache),
        ServiceSettings::default(),
    );

    let err = service
        .get_playlist(&PlaylistId::new("p1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PlaylistError::Timeout {
            operation: "get_by_id"
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Internal);
}
