// ABOUTME: Preference records and schema definitions
// ABOUTME: Definitions govern type, default, allowed values, category and encryption per key

use crate::value::{PreferenceType, PreferenceValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One user's stored value for a definition key.
///
/// `value` and `default_value` carry the shape declared by `value_type` in
/// every record visible to callers. At-rest records for encrypted
/// definitions carry the ciphertext token as a string value instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preference {
    pub user_id: String,
    pub key: String,
    pub value: PreferenceValue,
    pub default_value: PreferenceValue,
    pub value_type: PreferenceType,
    pub category: String,
    pub last_updated: DateTime<Utc>,
}

/// Custom validation hook attached to a definition. Rejection carries an
/// application-supplied message.
pub type Validator = Arc<dyn Fn(&PreferenceValue) -> Result<(), String> + Send + Sync>;

/// Schema entry governing a preference key.
#[derive(Clone)]
pub struct PreferenceDefinition {
    pub key: String,
    pub value_type: PreferenceType,
    pub default_value: PreferenceValue,
    pub category: String,
    pub allowed_values: Vec<PreferenceValue>,
    pub validator: Option<Validator>,
    pub encrypted: bool,
}

impl PreferenceDefinition {
    pub fn new(
        key: impl Into<String>,
        value_type: PreferenceType,
        default_value: PreferenceValue,
    ) -> Self {
        Self {
            key: key.into(),
            value_type,
            default_value,
            category: String::new(),
            allowed_values: Vec::new(),
            validator: None,
            encrypted: false,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Restrict accepted values to this set. An empty set accepts any value
    /// of the declared type.
    pub fn with_allowed_values(mut self, allowed_values: Vec<PreferenceValue>) -> Self {
        self.allowed_values = allowed_values;
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Mark the value as encrypted at rest in both storage tiers.
    pub fn with_encryption(mut self) -> Self {
        self.encrypted = true;
        self
    }
}

impl fmt::Debug for PreferenceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceDefinition")
            .field("key", &self.key)
            .field("value_type", &self.value_type)
            .field("default_value", &self.default_value)
            .field("category", &self.category)
            .field("allowed_values", &self.allowed_values)
            .field("has_validator", &self.validator.is_some())
            .field("encrypted", &self.encrypted)
            .finish()
    }
}
