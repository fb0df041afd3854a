// ABOUTME: In-memory reference implementation of the durable store contract
// ABOUTME: Holds codec-encoded records keyed by (user, key); doubles as the test substrate

use std::collections::HashMap;

use async_trait::async_trait;
use prefstore_core::Preference;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{codec, PreferenceStore, StorageError, StorageResult};

/// In-memory durable store. Records are held in the same codec-encoded form
/// a remote backend would persist, so round-trip fidelity is exercised on
/// every call.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn get(&self, user_id: &str, key: &str) -> StorageResult<Preference> {
        let records = self.records.read().await;
        let payload = records
            .get(&(user_id.to_string(), key.to_string()))
            .ok_or(StorageError::NotFound)?;
        codec::decode(payload)
    }

    async fn set(&self, preference: &Preference) -> StorageResult<()> {
        let payload = codec::encode(preference)?;
        let mut records = self.records.write().await;
        debug!(user = %preference.user_id, key = %preference.key, "storing preference record");
        records.insert(
            (preference.user_id.clone(), preference.key.clone()),
            payload,
        );
        Ok(())
    }

    async fn delete(&self, user_id: &str, key: &str) -> StorageResult<()> {
        let mut records = self.records.write().await;
        records
            .remove(&(user_id.to_string(), key.to_string()))
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    async fn get_all(&self, user_id: &str) -> StorageResult<Vec<Preference>> {
        let records = self.records.read().await;
        let mut out = Vec::new();
        for ((user, _), payload) in records.iter() {
            if user == user_id {
                out.push(codec::decode(payload)?);
            }
        }
        Ok(out)
    }

    async fn get_by_category(
        &self,
        user_id: &str,
        category: &str,
    ) -> StorageResult<Vec<Preference>> {
        let records = self.records.read().await;
        let mut out = Vec::new();
        for ((user, _), payload) in records.iter() {
            if user != user_id {
                continue;
            }
            let record = codec::decode(payload)?;
            if record.category == category {
                out.push(record);
            }
        }
        Ok(out)
    }

    async fn close(&self) -> StorageResult<()> {
        self.records.write().await.clear();
        Ok(())
    }
}
