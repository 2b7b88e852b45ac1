/// Cadence Server - playlist service with new-release ingestion
use cadence_cache::{MemoryCache, NoopCache};
use cadence_core::{PlaylistCache, PlaylistStore, Track, TrackId, UserId};
use cadence_server::{
    api,
    config::{CacheBackend, CacheSettings, ServerConfig},
    jobs::{IngestionSettings, IngestionWorker},
    services::{PlaylistService, ServiceSettings},
    state::AppState,
};
use cadence_storage::{SqliteFeed, SqlitePlaylistStore};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence-server")]
#[command(about = "Cadence playlist service", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server and the ingestion worker
    Serve,
    /// Append a track-created event to the durable feed
    PublishTrack {
        #[arg(long)]
        title: String,
        #[arg(long)]
        artist: String,
        /// Duration in seconds
        #[arg(long, default_value_t = 0)]
        duration: u32,
        #[arg(long, default_value = "")]
        album: String,
        /// Track id; generated when omitted
        #[arg(long)]
        id: Option<String>,
    },
    /// List playlists owned by a user
    ListPlaylists {
        #[arg(short, long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cadence_server=info,cadence_storage=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::load_from(cli.config.as_deref())?;
    config.validate()?;

    match cli.command {
        Commands::Serve => serve(config).await?,
        Commands::PublishTrack {
            title,
            artist,
            duration,
            album,
            id,
        } => {
            let track = Track::new(title, artist, duration)
                .with_album(album)
                .with_id(id.map_or_else(TrackId::generate, TrackId::new));
            publish_track(&config, &track).await?;
        }
        Commands::ListPlaylists { user } => list_playlists(&config, &user).await?,
    }

    Ok(())
}

async fn open_database(config: &ServerConfig) -> anyhow::Result<SqlitePool> {
    let pool = cadence_storage::create_pool_with(
        &config.storage.database_url,
        config.storage.max_connections,
    )
    .await?;
    cadence_storage::run_migrations(&pool).await?;
    Ok(pool)
}

async fn build_cache(settings: &CacheSettings) -> anyhow::Result<Arc<dyn PlaylistCache>> {
    let cache: Arc<dyn PlaylistCache> = match settings.backend {
        CacheBackend::Memory => Arc::new(MemoryCache::new(settings.capacity)?),
        CacheBackend::None => Arc::new(NoopCache),
        #[cfg(feature = "redis")]
        CacheBackend::Redis => {
            let url = settings.redis_url.as_deref().unwrap_or_default();
            Arc::new(cadence_cache::RedisCache::connect(url).await?)
        }
        #[cfg(not(feature = "redis"))]
        CacheBackend::Redis => {
            anyhow::bail!("cache.backend = \"redis\" requires the `redis` feature")
        }
    };
    tracing::info!(backend = ?settings.backend, "Cache initialized");
    Ok(cache)
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    tracing::info!("Starting Cadence Server");
    tracing::info!("Host: {}", config.server.host);
    tracing::info!("Port: {}", config.server.port);

    // Initialize database
    let pool = open_database(&config).await?;
    let store: Arc<dyn PlaylistStore> = Arc::new(SqlitePlaylistStore::new(pool.clone()));
    tracing::info!("Database connected");

    let cache = build_cache(&config.cache).await?;

    let service = PlaylistService::new(
        store,
        cache,
        ServiceSettings {
            cache_ttl: config.cache.ttl(),
            store_timeout: config.storage.timeout(),
            cache_timeout: config.cache.timeout(),
        },
    );

    // Start ingestion worker
    let worker = if config.ingestion.enabled {
        let source = SqliteFeed::new(
            pool.clone(),
            config.ingestion.topic.clone(),
            config.ingestion.consumer_group.clone(),
            config.ingestion.poll_interval(),
        );
        let worker = IngestionWorker::new(
            service.clone(),
            IngestionSettings {
                playlist_name: config.ingestion.playlist_name.clone(),
                system_owner: UserId::new(config.ingestion.system_owner.clone()),
                max_attempts: config.ingestion.max_attempts,
                retry_backoff: config.ingestion.retry_backoff(),
            },
        );
        tracing::info!(
            topic = %config.ingestion.topic,
            group = %config.ingestion.consumer_group,
            "Ingestion worker starting"
        );
        Some(worker.spawn(source))
    } else {
        None
    };

    // Build router
    let app = api::router(AppState::new(service));

    // Create server address
    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    tracing::info!("Server listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(worker) = worker {
        let stats = worker.shutdown().await;
        tracing::info!(?stats, "Ingestion worker drained");
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

async fn publish_track(config: &ServerConfig, track: &Track) -> anyhow::Result<()> {
    let pool = open_database(config).await?;
    let payload = serde_json::to_vec(track)?;

    let offset = cadence_storage::feed::publish(
        &pool,
        &config.ingestion.topic,
        Some(track.id.as_str()),
        &payload,
    )
    .await?;

    println!(
        "Published track {} to {} at offset {}",
        track.id, config.ingestion.topic, offset
    );

    Ok(())
}

async fn list_playlists(config: &ServerConfig, user: &str) -> anyhow::Result<()> {
    let pool = open_database(config).await?;
    let store = SqlitePlaylistStore::new(pool);

    let playlists = store.get_by_owner(&UserId::new(user)).await?;

    println!("Playlists owned by {user}:");
    for playlist in playlists {
        println!(
            "  {} - {} ({} tracks)",
            playlist.id,
            playlist.name,
            playlist.tracks.len()
        );
    }

    Ok(())
}
