// ABOUTME: Durable store contract for preference records
// ABOUTME: Storage error taxonomy, the record codec, and the bundled memory backend

use async_trait::async_trait;
use prefstore_core::Preference;
use thiserror::Error;

pub mod codec;
pub mod memory;

pub use memory::MemoryStore;

/// Storage errors. `NotFound` is the reserved absence sentinel; every other
/// variant is a backend failure.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("preference not found")]
    NotFound,
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Durable store contract that all preference backends implement.
///
/// The store is the authoritative tier: callers treat its failures as hard
/// errors, while `NotFound` means the user never persisted the key.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Fetch one record. `StorageError::NotFound` when the user has never
    /// persisted this key.
    async fn get(&self, user_id: &str, key: &str) -> StorageResult<Preference>;

    /// Insert or overwrite one record.
    async fn set(&self, preference: &Preference) -> StorageResult<()>;

    /// Remove one record. `StorageError::NotFound` when absent.
    async fn delete(&self, user_id: &str, key: &str) -> StorageResult<()>;

    /// Every record persisted for the user.
    async fn get_all(&self, user_id: &str) -> StorageResult<Vec<Preference>>;

    /// Records persisted for the user in one category, as a single bulk
    /// query.
    async fn get_by_category(&self, user_id: &str, category: &str)
        -> StorageResult<Vec<Preference>>;

    /// Release backend resources. Lifecycle belongs to whoever constructed
    /// the backend; the preference manager never calls this on injected
    /// stores.
    async fn close(&self) -> StorageResult<()>;
}
