//! Persistence of finished isochrones.
//!
//! The engine needs two things from storage: whether a result already
//! exists for a (mode, strategy, station, time bucket), and a place to
//! put new bands. [`MemoryStore`] keeps records in process; [`FileStore`]
//! writes one GeoJSON FeatureCollection per record.

mod error;
mod file;
mod memory;

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{IsochroneBand, Mode, Strategy};

pub use error::PersistenceError;
pub use file::FileStore;
pub use memory::MemoryStore;

/// Identity of a stored isochrone set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub mode: Mode,
    pub strategy: Strategy,
    /// Station name for point isochrones.
    pub station: Option<String>,
    /// Time bucket index, as produced by the trip cache.
    pub bucket: i64,
}

impl RecordKey {
    pub fn new(mode: Mode, strategy: Strategy, station: Option<String>, bucket: i64) -> Self {
        Self {
            mode,
            strategy,
            station,
            bucket,
        }
    }
}

/// Context stored alongside the bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub key: RecordKey,
    pub computed_at: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub samples: usize,
    pub successful: usize,
    #[serde(default)]
    pub used_modes: Vec<String>,
    #[serde(default)]
    pub station_names: Vec<String>,
}

/// Durable storage of isochrone bands.
pub trait PersistenceGateway: Send + Sync {
    /// Whether a record for `key` has been saved.
    fn exists(&self, key: &RecordKey) -> impl Future<Output = Result<bool, PersistenceError>> + Send;

    /// Store `bands` under `metadata.key`, replacing any previous record.
    fn save(
        &self,
        bands: &[IsochroneBand],
        metadata: &RecordMetadata,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

/// The store selected at startup.
#[derive(Debug, Clone)]
pub enum Store {
    Memory(MemoryStore),
    File(FileStore),
}

impl PersistenceGateway for Store {
    async fn exists(&self, key: &RecordKey) -> Result<bool, PersistenceError> {
        match self {
            Store::Memory(store) => store.exists(key).await,
            Store::File(store) => store.exists(key).await,
        }
    }

    async fn save(
        &self,
        bands: &[IsochroneBand],
        metadata: &RecordMetadata,
    ) -> Result<(), PersistenceError> {
        match self {
            Store::Memory(store) => store.save(bands, metadata).await,
            Store::File(store) => store.save(bands, metadata).await,
        }
    }
}
