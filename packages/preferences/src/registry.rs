// ABOUTME: Concurrent registry of preference definitions keyed by name
// ABOUTME: Upsert-only schema map behind one reader/writer lock

use std::collections::HashMap;

use prefstore_core::PreferenceDefinition;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::PreferenceError;

/// Schema registry. Definitions are upserted, never deleted at runtime; the
/// manager owns exactly one of these.
#[derive(Default)]
pub struct DefinitionRegistry {
    definitions: RwLock<HashMap<String, PreferenceDefinition>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or overwrite a definition. The default value must carry the
    /// declared shape; nothing else about it is checked here.
    pub async fn define(&self, definition: PreferenceDefinition) -> Result<(), PreferenceError> {
        if definition.key.is_empty() {
            return Err(PreferenceError::InvalidInput(
                "definition key is empty".to_string(),
            ));
        }
        if definition.default_value.kind() != definition.value_type {
            return Err(PreferenceError::InvalidType(format!(
                "default value for {} is {}, declared type is {}",
                definition.key,
                definition.default_value.kind(),
                definition.value_type,
            )));
        }

        let mut definitions = self.definitions.write().await;
        debug!(key = %definition.key, "registering preference definition");
        definitions.insert(definition.key.clone(), definition);
        Ok(())
    }

    pub async fn lookup(&self, key: &str) -> Option<PreferenceDefinition> {
        self.definitions.read().await.get(key).cloned()
    }

    pub async fn all(&self) -> Vec<PreferenceDefinition> {
        self.definitions.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prefstore_core::{PreferenceType, PreferenceValue};

    #[tokio::test]
    async fn test_define_rejects_empty_key() {
        let registry = DefinitionRegistry::new();
        let err = registry
            .define(PreferenceDefinition::new(
                "",
                PreferenceType::String,
                "x".into(),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, PreferenceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_define_rejects_default_of_wrong_shape() {
        let registry = DefinitionRegistry::new();
        let err = registry
            .define(PreferenceDefinition::new(
                "retries",
                PreferenceType::Int,
                PreferenceValue::String("three".into()),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, PreferenceError::InvalidType(_)));
    }

    #[tokio::test]
    async fn test_redefinition_overwrites() {
        let registry = DefinitionRegistry::new();
        registry
            .define(PreferenceDefinition::new(
                "retries",
                PreferenceType::Int,
                3i64.into(),
            ))
            .await
            .unwrap();
        registry
            .define(PreferenceDefinition::new(
                "retries",
                PreferenceType::Int,
                5i64.into(),
            ))
            .await
            .unwrap();

        let def = registry.lookup("retries").await.unwrap();
        assert_eq!(def.default_value, PreferenceValue::Int(5));
        assert_eq!(registry.all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_missing_key() {
        let registry = DefinitionRegistry::new();
        assert!(registry.lookup("ghost").await.is_none());
    }
}
