// ABOUTME: Cache contract for preference record bytes
// ABOUTME: Cache error taxonomy and the bundled in-process TTL cache

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod memory;

pub use memory::MemoryCache;

/// Cache errors. `NotFound` is the reserved absence sentinel covering keys
/// never set, deleted, or expired; `Closed` is returned by every operation
/// issued after `close`.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache entry not found")]
    NotFound,
    #[error("cache is closed")]
    Closed,
    #[error("backend error: {0}")]
    Backend(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Cache contract. Payloads are opaque record bytes; a remote cache backend
/// implements the same surface.
#[async_trait]
pub trait PreferenceCache: Send + Sync {
    /// Fetch a payload. `CacheError::NotFound` for absent or expired
    /// entries.
    async fn get(&self, key: &str) -> CacheResult<Vec<u8>>;

    /// Store a payload. `None` means the entry never expires.
    async fn set(&self, key: &str, payload: &[u8], ttl: Option<Duration>) -> CacheResult<()>;

    /// Remove an entry. Idempotent.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Stop background work and drop all entries. Idempotent; every
    /// operation issued afterwards fails with `CacheError::Closed`.
    async fn close(&self) -> CacheResult<()>;
}
