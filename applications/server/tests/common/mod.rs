//! Common test utilities and fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use cadence_cache::MemoryCache;
use cadence_core::{
    cache_key_for_owner, Playlist, PlaylistCache, PlaylistChanges, PlaylistError, PlaylistId,
    PlaylistStore, Result, Track, TrackId, UserId,
};
use cadence_server::{PlaylistService, ServiceSettings};
use cadence_storage::SqlitePlaylistStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Test database backed by a real SQLite file; removed on drop
pub struct TestDb {
    pub pool: sqlx::SqlitePool,
    _temp_dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!("sqlite://{}", temp_dir.path().join("test.db").display());

        let pool = cadence_storage::create_pool(&db_url)
            .await
            .expect("Failed to create pool");
        cadence_storage::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        Self {
            pool,
            _temp_dir: temp_dir,
        }
    }
}

/// Store wrapper that counts calls per operation
pub struct CountingStore {
    inner: Arc<dyn PlaylistStore>,
    pub creates: AtomicUsize,
    pub reads: AtomicUsize,
    pub owner_queries: AtomicUsize,
    pub writes: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn PlaylistStore>) -> Self {
        Self {
            inner,
            creates: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            owner_queries: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn owner_queries(&self) -> usize {
        self.owner_queries.load(Ordering::SeqCst)
    }

    /// Calls that could have changed stored state
    pub fn mutations(&self) -> usize {
        self.creates.load(Ordering::SeqCst) + self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaylistStore for CountingStore {
    async fn create(&self, playlist: Playlist) -> Result<Playlist> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create(playlist).await
    }

    async fn get_by_id(&self, id: &PlaylistId) -> Result<Playlist> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_id(id).await
    }

    async fn get_by_owner(&self, owner_id: &UserId) -> Result<Vec<Playlist>> {
        self.owner_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_owner(owner_id).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Playlist>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_name(name).await
    }

    async fn update(&self, id: &PlaylistId, changes: &PlaylistChanges) -> Result<Playlist> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update(id, changes).await
    }

    async fn add_track(&self, playlist_id: &PlaylistId, track: Track) -> Result<Playlist> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.add_track(playlist_id, track).await
    }

    async fn remove_track(
        &self,
        playlist_id: &PlaylistId,
        track_id: &TrackId,
    ) -> Result<Playlist> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove_track(playlist_id, track_id).await
    }

    async fn delete(&self, id: &PlaylistId, owner_id: &UserId) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(id, owner_id).await
    }
}

/// Store whose calls never complete
pub struct StalledStore;

#[async_trait]
impl PlaylistStore for StalledStore {
    async fn create(&self, _playlist: Playlist) -> Result<Playlist> {
        std::future::pending().await
    }

    async fn get_by_id(&self, _id: &PlaylistId) -> Result<Playlist> {
        std::future::pending().await
    }

    async fn get_by_owner(&self, _owner_id: &UserId) -> Result<Vec<Playlist>> {
        std::future::pending().await
    }

    async fn get_by_name(&self, _name: &str) -> Result<Option<Playlist>> {
        std::future::pending().await
    }

    async fn update(&self, _id: &PlaylistId, _changes: &PlaylistChanges) -> Result<Playlist> {
        std::future::pending().await
    }

    async fn add_track(&self, _playlist_id: &PlaylistId, _track: Track) -> Result<Playlist> {
        std::future::pending().await
    }

    async fn remove_track(
        &self,
        _playlist_id: &PlaylistId,
        _track_id: &TrackId,
    ) -> Result<Playlist> {
        std::future::pending().await
    }

    async fn delete(&self, _id: &PlaylistId, _owner_id: &UserId) -> Result<()> {
        std::future::pending().await
    }
}

/// Store that appends a track from another producer just before each update
/// reaches the underlying store
pub struct InterleavingStore {
    inner: Arc<dyn PlaylistStore>,
    interloper: Track,
}

impl InterleavingStore {
    pub fn new(inner: Arc<dyn PlaylistStore>, interloper: Track) -> Self {
        Self { inner, interloper }
    }
}

#[async_trait]
impl PlaylistStore for InterleavingStore {
    async fn create(&self, playlist: Playlist) -> Result<Playlist> {
        self.inner.create(playlist).await
    }

    async fn get_by_id(&self, id: &PlaylistId) -> Result<Playlist> {
        self.inner.get_by_id(id).await
    }

    async fn get_by_owner(&self, owner_id: &UserId) -> Result<Vec<Playlist>> {
        self.inner.get_by_owner(owner_id).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Playlist>> {
        self.inner.get_by_name(name).await
    }

    async fn update(&self, id: &PlaylistId, changes: &PlaylistChanges) -> Result<Playlist> {
        self.inner.add_track(id, self.interloper.clone()).await?;
        self.inner.update(id, changes).await
    }

    async fn add_track(&self, playlist_id: &PlaylistId, track: Track) -> Result<Playlist> {
        self.inner.add_track(playlist_id, track).await
    }

    async fn remove_track(
        &self,
        playlist_id: &PlaylistId,
        track_id: &TrackId,
    ) -> Result<Playlist> {
        self.inner.remove_track(playlist_id, track_id).await
    }

    async fn delete(&self, id: &PlaylistId, owner_id: &UserId) -> Result<()> {
        self.inner.delete(id, owner_id).await
    }
}

/// Store that records, on entry to each track or metadata mutation, whether
/// the owner's list was still cached
pub struct CacheWatchingStore {
    inner: Arc<dyn PlaylistStore>,
    cache: Arc<dyn PlaylistCache>,
    owner: UserId,
    seen: Mutex<Vec<(&'static str, bool)>>,
}

impl CacheWatchingStore {
    pub fn new(inner: Arc<dyn PlaylistStore>, cache: Arc<dyn PlaylistCache>, owner: &str) -> Self {
        Self {
            inner,
            cache,
            owner: UserId::new(owner),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// `(operation, cached_on_entry)` in call order
    pub fn seen(&self) -> Vec<(&'static str, bool)> {
        self.seen.lock().expect("seen lock").clone()
    }

    async fn observe(&self, operation: &'static str) {
        let cached = self
            .cache
            .get(&cache_key_for_owner(&self.owner))
            .await
            .expect("cache get")
            .is_some();
        self.seen.lock().expect("seen lock").push((operation, cached));
    }
}

#[async_trait]
impl PlaylistStore for CacheWatchingStore {
    async fn create(&self, playlist: Playlist) -> Result<Playlist> {
        self.inner.create(playlist).await
    }

    async fn get_by_id(&self, id: &PlaylistId) -> Result<Playlist> {
        self.inner.get_by_id(id).await
    }

    async fn get_by_owner(&self, owner_id: &UserId) -> Result<Vec<Playlist>> {
        self.inner.get_by_owner(owner_id).await
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<Playlist>> {
        self.inner.get_by_name(name).await
    }

    async fn update(&self, id: &PlaylistId, changes: &PlaylistChanges) -> Result<Playlist> {
        self.observe("update").await;
        self.inner.update(id, changes).await
    }

    async fn add_track(&self, playlist_id: &PlaylistId, track: Track) -> Result<Playlist> {
        self.observe("add_track").await;
        self.inner.add_track(playlist_id, track).await
    }

    async fn remove_track(
        &self,
        playlist_id: &PlaylistId,
        track_id: &TrackId,
    ) -> Result<Playlist> {
        self.observe("remove_track").await;
        self.inner.remove_track(playlist_id, track_id).await
    }

    async fn delete(&self, id: &PlaylistId, owner_id: &UserId) -> Result<()> {
        self.inner.delete(id, owner_id).await
    }
}

/// Cache that fails every call
pub struct BrokenCache;

#[async_trait]
impl PlaylistCache for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Err(PlaylistError::cache("connection refused"))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<()> {
        Err(PlaylistError::cache("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(PlaylistError::cache("connection refused"))
    }
}

/// Service wired to a real database, a memory cache and a counting store
pub struct Harness {
    pub db: TestDb,
    pub store: Arc<CountingStore>,
    pub cache: Arc<MemoryCache>,
    pub service: PlaylistService,
}

impl Harness {
    pub async fn new() -> Self {
        let db = TestDb::new().await;
        let store = Arc::new(CountingStore::new(Arc::new(SqlitePlaylistStore::new(
            db.pool.clone(),
        ))));
        let cache = Arc::new(MemoryCache::new(128).expect("cache"));
        let service = PlaylistService::new(
            store.clone(),
            cache.clone(),
            ServiceSettings::default(),
        );

        Self {
            db,
            store,
            cache,
            service,
        }
    }

    /// Whether the owner's list is currently cached
    pub async fn is_cached(&self, owner: &str) -> bool {
        self.cache
            .get(&cache_key_for_owner(&UserId::new(owner)))
            .await
            .expect("memory cache never fails")
            .is_some()
    }
}

/// Track fixture with a fixed id
pub fn track(id: &str, title: &str) -> Track {
    Track::new(title, "Test Artist", 180).with_id(id)
}
