/// Server configuration
use crate::error::{Result, ServerError};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_server")]
    pub server: ServerSettings,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_cache")]
    pub cache: CacheSettings,

    #[serde(default = "default_ingestion")]
    pub ingestion: IngestionSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Upper bound for a single store call
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
    None,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackend,

    /// Maximum number of keys held by the memory backend
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Upper bound for a single cache call
    #[serde(default = "default_cache_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestionSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_topic")]
    pub topic: String,

    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,

    /// Name of the shared playlist new tracks are collected into
    #[serde(default = "default_playlist_name")]
    pub playlist_name: String,

    /// Owner recorded on the shared playlist
    #[serde(default = "default_system_owner")]
    pub system_owner: String,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl StorageSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl IngestionSettings {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl ServerConfig {
    /// Load configuration from `config.toml` (if present) and environment
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from an explicit file, falling back to `config.toml`.
    ///
    /// Environment variables override file values, e.g.
    /// `CADENCE_SERVER__PORT=9000` or `CADENCE_CACHE__BACKEND=redis`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let config_path = PathBuf::from("config.toml");
                if config_path.exists() {
                    settings = settings.add_source(config::File::from(config_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.host.parse::<IpAddr>().is_err() {
            return Err(ServerError::Config(format!(
                "server.host is not an IP address: {}",
                self.server.host
            )));
        }

        if self.storage.database_url.is_empty() {
            return Err(ServerError::Config(
                "storage.database_url is required".to_string(),
            ));
        }

        if self.storage.timeout_ms == 0 || self.cache.timeout_ms == 0 {
            return Err(ServerError::Config(
                "timeouts must be greater than zero".to_string(),
            ));
        }

        match self.cache.backend {
            CacheBackend::Memory if self.cache.capacity == 0 => {
                return Err(ServerError::Config(
                    "cache.capacity must be greater than zero".to_string(),
                ));
            }
            CacheBackend::Redis if self.cache.redis_url.as_deref().unwrap_or("").is_empty() => {
                return Err(ServerError::Config(
                    "cache.redis_url is required for the redis backend".to_string(),
                ));
            }
            _ => {}
        }

        if self.ingestion.enabled {
            let required = [
                ("ingestion.topic", &self.ingestion.topic),
                ("ingestion.consumer_group", &self.ingestion.consumer_group),
                ("ingestion.playlist_name", &self.ingestion.playlist_name),
                ("ingestion.system_owner", &self.ingestion.system_owner),
            ];
            if let Some((field, _)) = required.iter().find(|(_, value)| value.is_empty()) {
                return Err(ServerError::Config(format!("{field} cannot be empty")));
            }

            if self.ingestion.max_attempts == 0 {
                return Err(ServerError::Config(
                    "ingestion.max_attempts must be at least 1".to_string(),
                ));
            }
        }

        Ok(())
    }
}

// Default values
fn default_server() -> ServerSettings {
    ServerSettings {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
        max_connections: default_max_connections(),
        timeout_ms: default_store_timeout_ms(),
    }
}

fn default_database_url() -> String {
    "sqlite://./data/cadence.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_store_timeout_ms() -> u64 {
    5_000
}

fn default_cache() -> CacheSettings {
    CacheSettings {
        backend: default_cache_backend(),
        capacity: default_cache_capacity(),
        ttl_secs: default_cache_ttl_secs(),
        timeout_ms: default_cache_timeout_ms(),
        redis_url: None,
    }
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::Memory
}

fn default_cache_capacity() -> usize {
    10_000
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_cache_timeout_ms() -> u64 {
    500
}

fn default_ingestion() -> IngestionSettings {
    IngestionSettings {
        enabled: default_enabled(),
        topic: default_topic(),
        consumer_group: default_consumer_group(),
        playlist_name: default_playlist_name(),
        system_owner: default_system_owner(),
        max_attempts: default_max_attempts(),
        retry_backoff_ms: default_retry_backoff_ms(),
        poll_interval_ms: default_poll_interval_ms(),
    }
}

fn default_enabled() -> bool {
    true
}

fn default_topic() -> String {
    "track.created".to_string()
}

fn default_consumer_group() -> String {
    "playlist-consumer-group".to_string()
}

fn default_playlist_name() -> String {
    "Новинки".to_string()
}

fn default_system_owner() -> String {
    "system".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    200
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            storage: default_storage(),
            cache: default_cache(),
            ingestion: default_ingestion(),
        }
    }
}
