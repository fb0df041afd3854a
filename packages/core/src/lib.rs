// ABOUTME: Core types for prefstore
// ABOUTME: Preference records, the typed value union, and schema definitions

pub mod types;
pub mod value;

// Re-export main types
pub use types::{Preference, PreferenceDefinition, Validator};
pub use value::{PreferenceType, PreferenceValue, UnknownTypeTag};
