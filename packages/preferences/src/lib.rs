// ABOUTME: Schema-governed preference management
// ABOUTME: The manager reconciles registry, cache, durable store and encryption into one contract

pub mod error;
pub mod manager;
pub mod policy;
pub mod registry;
pub mod validation;

pub use error::PreferenceError;
pub use manager::PreferenceManager;
pub use registry::DefinitionRegistry;
pub use validation::{validate, ValidationError};

// Re-export the domain types callers build requests from
pub use prefstore_core::{
    Preference, PreferenceDefinition, PreferenceType, PreferenceValue, Validator,
};
