// ABOUTME: Error taxonomy surfaced by the preference manager
// ABOUTME: Input, validation and backend tiers; absence sentinels never reach callers

use prefstore_cache::CacheError;
use prefstore_security::EncryptionError;
use prefstore_storage::StorageError;
use thiserror::Error;

use crate::validation::ValidationError;

/// Errors surfaced by [`crate::PreferenceManager`].
///
/// Input errors (`NotDefined`, `InvalidInput`, `InvalidType`) are checked
/// eagerly and never reach a backend. Validation errors are raised before
/// any side effect. Backend failures are wrapped with context; absence
/// sentinels are absorbed into default-value fallback before this type is
/// ever constructed.
#[derive(Error, Debug)]
pub enum PreferenceError {
    #[error("preference not defined: {0}")]
    NotDefined(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid definition: {0}")]
    InvalidType(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error("serialization failure ({context}): {reason}")]
    Serialization { context: String, reason: String },

    #[error("store operation failed ({context}): {source}")]
    Store {
        context: String,
        #[source]
        source: StorageError,
    },

    #[error("cache operation failed ({context}): {source}")]
    Cache {
        context: String,
        #[source]
        source: CacheError,
    },
}
