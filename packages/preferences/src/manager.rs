// ABOUTME: The consistency engine reconciling registry, cache, store and encryption
// ABOUTME: Cache-aside reads with fail-soft degradation, write-through sets, default synthesis

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use prefstore_cache::{CacheError, PreferenceCache};
use prefstore_core::{Preference, PreferenceDefinition, PreferenceValue};
use prefstore_security::Encryptor;
use prefstore_storage::{codec, PreferenceStore, StorageError};
use tracing::{debug, warn};

use crate::error::PreferenceError;
use crate::policy::{disposition, BackendOp, Disposition};
use crate::registry::DefinitionRegistry;
use crate::validation::validate;

/// Default bound on how long a repopulated cache entry lives.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Result of the cache leg of a read.
enum CacheOutcome {
    /// Usable record, already decrypted.
    Hit(Preference),
    /// Absence sentinel; fall through to the store.
    Miss,
    /// Cache failure degraded per policy; serve the definition default.
    Degraded,
}

/// Schema-governed preference manager.
///
/// Reads are cache-aside, writes are write-through, and defaults are
/// synthesized for keys the user never set. The injected store, cache and
/// encryptor are shared dependencies; the manager never closes them.
pub struct PreferenceManager {
    registry: DefinitionRegistry,
    store: Arc<dyn PreferenceStore>,
    cache: Option<Arc<dyn PreferenceCache>>,
    encryptor: Option<Arc<dyn Encryptor>>,
    cache_ttl: Duration,
}

impl PreferenceManager {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self {
            registry: DefinitionRegistry::new(),
            store,
            cache: None,
            encryptor: None,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn PreferenceCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_encryptor(mut self, encryptor: Arc<dyn Encryptor>) -> Self {
        self.encryptor = Some(encryptor);
        self
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    /// Register or overwrite a preference definition.
    pub async fn define_preference(
        &self,
        definition: PreferenceDefinition,
    ) -> Result<(), PreferenceError> {
        self.registry.define(definition).await
    }

    /// Fetch one preference, synthesizing the definition default when the
    /// user never set the key.
    pub async fn get(&self, user_id: &str, key: &str) -> Result<Preference, PreferenceError> {
        let definition = self.resolve(user_id, key).await?;

        if let Some(cache) = &self.cache {
            match self
                .read_cache(cache.as_ref(), user_id, key, &definition)
                .await?
            {
                CacheOutcome::Hit(preference) => return Ok(preference),
                CacheOutcome::Miss => {}
                CacheOutcome::Degraded => return Ok(self.synthesize(user_id, &definition)),
            }
        }

        let record = match self.store.get(user_id, key).await {
            Ok(record) => record,
            // First use: nothing persisted yet, absence is not an error.
            Err(StorageError::NotFound) => {
                return Ok(self.synthesize(user_id, &definition));
            }
            Err(source) => {
                let err = PreferenceError::Store {
                    context: format!("key {key}"),
                    source,
                };
                return match Self::route_failure(BackendOp::StoreRead, key, err) {
                    Some(err) => Err(err),
                    None => Ok(self.synthesize(user_id, &definition)),
                };
            }
        };

        self.repopulate_cache(user_id, key, &record).await;
        self.reveal(record, &definition)
    }

    /// Validate and write one preference through to the store, then
    /// best-effort into the cache.
    pub async fn set(
        &self,
        user_id: &str,
        key: &str,
        value: PreferenceValue,
    ) -> Result<(), PreferenceError> {
        let definition = self.resolve(user_id, key).await?;
        validate(&value, &definition)?;

        let record = Preference {
            user_id: user_id.to_string(),
            key: key.to_string(),
            value,
            default_value: definition.default_value.clone(),
            value_type: definition.value_type,
            category: definition.category.clone(),
            last_updated: Utc::now(),
        };
        // Encrypt before any tier sees the value; failure aborts the write.
        let record = self.conceal(record, &definition)?;

        if let Err(source) = self.store.set(&record).await {
            let err = PreferenceError::Store {
                context: format!("key {key}"),
                source,
            };
            if let Some(err) = Self::route_failure(BackendOp::StoreWrite, key, err) {
                return Err(err);
            }
        }
        debug!(user = user_id, key, "preference written through to store");

        self.repopulate_cache(user_id, key, &record).await;
        Ok(())
    }

    /// Remove one preference from both tiers. Store absence is success;
    /// cache invalidation is best-effort.
    pub async fn delete(&self, user_id: &str, key: &str) -> Result<(), PreferenceError> {
        self.resolve(user_id, key).await?;

        match self.store.delete(user_id, key).await {
            Ok(()) | Err(StorageError::NotFound) => {}
            Err(source) => {
                let err = PreferenceError::Store {
                    context: format!("key {key}"),
                    source,
                };
                if let Some(err) = Self::route_failure(BackendOp::StoreDelete, key, err) {
                    return Err(err);
                }
            }
        }

        if let Some(cache) = &self.cache {
            if let Err(source) = cache.delete(&Self::cache_key(user_id, key)).await {
                let err = PreferenceError::Cache {
                    context: format!("key {key}"),
                    source,
                };
                let _ = Self::route_failure(BackendOp::CacheDelete, key, err);
            }
        }
        Ok(())
    }

    /// Fetch every registered preference for the user, one `get` per
    /// definition, so unset keys appear with their defaults filled in.
    pub async fn get_all(
        &self,
        user_id: &str,
    ) -> Result<HashMap<String, Preference>, PreferenceError> {
        if user_id.is_empty() {
            return Err(PreferenceError::InvalidInput("user id is empty".to_string()));
        }

        let mut preferences = HashMap::new();
        for definition in self.registry.all().await {
            let preference = self.get(user_id, &definition.key).await?;
            preferences.insert(definition.key, preference);
        }
        Ok(preferences)
    }

    /// Fetch the user's persisted preferences in one category via a single
    /// bulk store query. Unlike `get_all`, unset keys are not represented.
    pub async fn get_by_category(
        &self,
        user_id: &str,
        category: &str,
    ) -> Result<HashMap<String, Preference>, PreferenceError> {
        if user_id.is_empty() {
            return Err(PreferenceError::InvalidInput("user id is empty".to_string()));
        }

        let records = self
            .store
            .get_by_category(user_id, category)
            .await
            .map_err(|source| PreferenceError::Store {
                context: format!("category {category}"),
                source,
            })?;

        let mut preferences = HashMap::new();
        for record in records {
            let Some(definition) = self.registry.lookup(&record.key).await else {
                warn!(key = %record.key, "persisted preference has no registered definition; skipping");
                continue;
            };
            let preference = self.reveal(record, &definition)?;
            preferences.insert(preference.key.clone(), preference);
        }
        Ok(preferences)
    }

    async fn resolve(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<PreferenceDefinition, PreferenceError> {
        if user_id.is_empty() {
            return Err(PreferenceError::InvalidInput("user id is empty".to_string()));
        }
        if key.is_empty() {
            return Err(PreferenceError::InvalidInput(
                "preference key is empty".to_string(),
            ));
        }
        self.registry
            .lookup(key)
            .await
            .ok_or_else(|| PreferenceError::NotDefined(key.to_string()))
    }

    fn cache_key(user_id: &str, key: &str) -> String {
        format!("{user_id}:{key}")
    }

    /// Synthesize the default-value record for a key the user never set.
    fn synthesize(&self, user_id: &str, definition: &PreferenceDefinition) -> Preference {
        Preference {
            user_id: user_id.to_string(),
            key: definition.key.clone(),
            value: definition.default_value.clone(),
            default_value: definition.default_value.clone(),
            value_type: definition.value_type,
            category: definition.category.clone(),
            last_updated: Utc::now(),
        }
    }

    /// Read the cache leg. The cache mirrors the store's at-rest
    /// representation, so a hit decodes to a full record and decrypts
    /// exactly like a store read.
    async fn read_cache(
        &self,
        cache: &dyn PreferenceCache,
        user_id: &str,
        key: &str,
        definition: &PreferenceDefinition,
    ) -> Result<CacheOutcome, PreferenceError> {
        let payload = match cache.get(&Self::cache_key(user_id, key)).await {
            Ok(payload) => payload,
            Err(CacheError::NotFound) => return Ok(CacheOutcome::Miss),
            Err(source) => {
                let err = PreferenceError::Cache {
                    context: format!("key {key}"),
                    source,
                };
                return Self::degrade(key, err);
            }
        };

        let record = match codec::decode(&payload) {
            Ok(record) => record,
            Err(source) => {
                let err = PreferenceError::Serialization {
                    context: format!("cached record for key {key}"),
                    reason: source.to_string(),
                };
                return Self::degrade(key, err);
            }
        };

        match self.reveal(record, definition) {
            Ok(preference) => {
                debug!(user = user_id, key, "cache hit");
                Ok(CacheOutcome::Hit(preference))
            }
            Err(err) => Self::degrade(key, err),
        }
    }

    /// Apply the cache-read policy row: degrade to the definition default
    /// or, should the table demand it, surface the error.
    fn degrade(key: &str, err: PreferenceError) -> Result<CacheOutcome, PreferenceError> {
        match Self::route_failure(BackendOp::CacheRead, key, err) {
            Some(err) => Err(err),
            None => Ok(CacheOutcome::Degraded),
        }
    }

    /// Push the at-rest record bytes into the cache with the bounded TTL.
    /// Both tiers hold the same representation, so encrypted values stay
    /// ciphertext here too.
    async fn repopulate_cache(&self, user_id: &str, key: &str, record: &Preference) {
        let Some(cache) = &self.cache else {
            return;
        };

        let payload = match codec::encode(record) {
            Ok(payload) => payload,
            Err(source) => {
                let err = PreferenceError::Serialization {
                    context: format!("record for key {key}"),
                    reason: source.to_string(),
                };
                let _ = Self::route_failure(BackendOp::CacheWrite, key, err);
                return;
            }
        };

        if let Err(source) = cache
            .set(&Self::cache_key(user_id, key), &payload, Some(self.cache_ttl))
            .await
        {
            let err = PreferenceError::Cache {
                context: format!("key {key}"),
                source,
            };
            let _ = Self::route_failure(BackendOp::CacheWrite, key, err);
        }
    }

    /// Convert a caller-facing record into its at-rest form: encrypted
    /// definitions carry the ciphertext token as a string value.
    fn conceal(
        &self,
        mut record: Preference,
        definition: &PreferenceDefinition,
    ) -> Result<Preference, PreferenceError> {
        if !definition.encrypted {
            return Ok(record);
        }
        let encryptor = self.require_encryptor(definition)?;

        let plaintext =
            serde_json::to_string(&record.value).map_err(|err| PreferenceError::Serialization {
                context: format!("value for key {}", record.key),
                reason: err.to_string(),
            })?;
        let token = encryptor.encrypt(&plaintext)?;
        record.value = PreferenceValue::String(token);
        Ok(record)
    }

    /// Reverse of `conceal`: open the ciphertext token back into the typed
    /// value.
    fn reveal(
        &self,
        mut record: Preference,
        definition: &PreferenceDefinition,
    ) -> Result<Preference, PreferenceError> {
        if !definition.encrypted {
            return Ok(record);
        }
        let encryptor = self.require_encryptor(definition)?;

        let token = match &record.value {
            PreferenceValue::String(token) => token.clone(),
            other => {
                return Err(PreferenceError::Serialization {
                    context: format!("at-rest record for key {}", record.key),
                    reason: format!("expected ciphertext token, found {} value", other.kind()),
                });
            }
        };
        let plaintext = encryptor.decrypt(&token)?;
        record.value =
            serde_json::from_str(&plaintext).map_err(|err| PreferenceError::Serialization {
                context: format!("decrypted value for key {}", record.key),
                reason: err.to_string(),
            })?;
        Ok(record)
    }

    fn require_encryptor(
        &self,
        definition: &PreferenceDefinition,
    ) -> Result<&Arc<dyn Encryptor>, PreferenceError> {
        self.encryptor.as_ref().ok_or_else(|| {
            PreferenceError::InvalidInput(format!(
                "definition {} is encrypted but no encryptor is configured",
                definition.key
            ))
        })
    }

    /// Route a backend failure through the policy table. `Some` means the
    /// caller must surface the error; `None` means it was logged and the
    /// operation continues on its fallback path.
    fn route_failure(op: BackendOp, key: &str, err: PreferenceError) -> Option<PreferenceError> {
        match disposition(op) {
            Disposition::Propagate => Some(err),
            Disposition::DefaultAndLog => {
                warn!(key, op = ?op, error = %err, "backend failure degraded to default value");
                None
            }
            Disposition::SwallowAndLog => {
                warn!(key, op = ?op, error = %err, "backend failure ignored; durable state already settled");
                None
            }
        }
    }
}
