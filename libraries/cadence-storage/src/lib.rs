//! Cadence Storage
//!
//! `SQLite` persistence for playlist documents and the durable track feed.
//!
//! # Architecture
//!
//! - **Vertical Slicing**: each feature owns its own queries (`playlists`, `feed`)
//! - **Single-statement mutations**: track append and removal run as one
//!   `UPDATE` against the playlist row, so concurrent writers never lose each
//!   other's changes
//! - **Two identifier encodings**: opaque string ids and historic structured
//!   keys resolve through the same lookups
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_storage::{create_pool, run_migrations, SqlitePlaylistStore};
//! use cadence_core::{Playlist, PlaylistStore, UserId};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://cadence.db").await?;
//! run_migrations(&pool).await?;
//!
//! let store = SqlitePlaylistStore::new(pool);
//! let playlist = store.create(Playlist::draft("Road Trip", UserId::new("u1"))).await?;
//! println!("created {}", playlist.id);
//! # Ok(())
//! # }
//! ```

mod context;
mod error;

// Vertical slices
pub mod feed;
pub mod playlists;

pub use context::SqlitePlaylistStore;
pub use error::StorageError;
pub use feed::SqliteFeed;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// This should be called once when the application starts to ensure
/// the database schema is up to date.
///
/// # Errors
///
/// Returns an error if migrations fail to run
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://cadence.db>`)
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    create_pool_with(database_url, 5).await
}

/// Create a new `SQLite` pool with an explicit connection limit
///
/// # Errors
///
/// Returns an error if the connection fails
pub async fn create_pool_with(
    database_url: &str,
    max_connections: u32,
) -> Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    tracing::debug!(database_url, "Creating SQLite pool");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await?;

    tracing::info!(max_connections, "SQLite pool ready");

    Ok(pool)
}
