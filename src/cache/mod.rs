use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod keys;
pub mod memory;

pub use memory::MemoryCache;

/// Errors from a CacheStore. All of them are recoverable.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Shared key-value store with per-key time-to-live.
///
/// Every operation is a point operation on a single key; implementations
/// must make each one atomic on its own.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a live value. Expired entries read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Write a value, replacing any existing entry and its TTL
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Remove an entry, returning whether a live entry existed
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Reset the TTL of a live entry without touching its value
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError>;

    /// Replace a live entry only if it still holds `expected`, restarting its
    /// TTL. Returns false, leaving the entry untouched, when it changed,
    /// expired or was removed since it was read.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: &str,
        value: String,
        ttl: Duration,
    ) -> Result<bool, CacheError>;

    /// Remaining lifetime of a live entry
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, CacheError>;

    /// Liveness probe for health checks
    async fn ping(&self) -> Result<(), CacheError>;
}

impl dyn CacheStore {
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw, ttl).await
    }
}
