//! In-process isochrone store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::IsochroneBand;

use super::{PersistenceError, PersistenceGateway, RecordKey, RecordMetadata};

type Record = (Vec<IsochroneBand>, RecordMetadata);

/// Keeps saved records in memory. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<RecordKey, Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bands saved under `key`.
    pub async fn bands(&self, key: &RecordKey) -> Option<Vec<IsochroneBand>> {
        self.records.read().await.get(key).map(|(b, _)| b.clone())
    }

    /// The metadata saved under `key`.
    pub async fn metadata(&self, key: &RecordKey) -> Option<RecordMetadata> {
        self.records.read().await.get(key).map(|(_, m)| m.clone())
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl PersistenceGateway for MemoryStore {
    async fn exists(&self, key: &RecordKey) -> Result<bool, PersistenceError> {
        Ok(self.records.read().await.contains_key(key))
    }

    async fn save(
        &self,
        bands: &[IsochroneBand],
        metadata: &RecordMetadata,
    ) -> Result<(), PersistenceError> {
        self.records
            .write()
            .await
            .insert(metadata.key.clone(), (bands.to_vec(), metadata.clone()));
        Ok(())
    }
}
