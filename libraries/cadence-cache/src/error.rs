use cadence_core::PlaylistError;
use thiserror::Error;

/// Cache backend errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Capacity must allow at least one entry
    #[error("cache capacity must be greater than zero")]
    ZeroCapacity,

    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

impl From<CacheError> for PlaylistError {
    fn from(err: CacheError) -> Self {
        PlaylistError::cache(err.to_string())
    }
}
