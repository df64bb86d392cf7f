//! Caching layer for resolved trips.
//!
//! Routing API calls dominate the cost of a computation, and neighbouring
//! requests share most of their trips. Resolved trips are cached under a
//! key made of the rounded endpoints, the mode, the anchor POI and a time
//! bucket.
//!
//! Time bucketing (15-minute buckets) bounds cache cardinality while
//! keeping results fresh enough for timetable-driven travel times.
//!
//! Only successful results are cached. Concurrent lookups of the same key
//! join a single in-flight resolution.
//!
//! The cache can be snapshotted to a JSON file and reloaded on startup, so
//! trips resolved before a restart are not requested again. A snapshot
//! older than the cache TTL is ignored.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache as MokaCache;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::{FailureReason, GridCoord, Mode, PoiId, TripPlan, TripResult};

/// Configuration for the trip cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,

    /// Time bucket size in minutes.
    pub bucket_mins: u32,

    /// Decimal places kept when rounding coordinates into a key.
    pub coord_decimals: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_capacity: 100_000,
            bucket_mins: 15,
            coord_decimals: 5,
        }
    }
}

impl CacheConfig {
    /// Time bucket containing `ts`: whole `bucket_mins` intervals since the epoch.
    pub fn time_bucket(&self, ts: DateTime<Utc>) -> i64 {
        let width = i64::from(self.bucket_mins.max(1)) * 60;
        ts.timestamp().div_euclid(width)
    }
}

/// Identity of a resolved trip.
///
/// Two plans with equal keys have equal legs: the legs are a function of
/// the endpoints, the mode and the POIs, and the first POI determines the
/// rest for a given mode and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub origin: GridCoord,
    pub destination: GridCoord,
    pub mode: Mode,
    pub poi: Option<PoiId>,
    pub direct: bool,
    pub bucket: i64,
}

impl CacheKey {
    /// Key for `plan` issued at `timestamp`.
    pub fn for_plan(plan: &TripPlan, timestamp: DateTime<Utc>, config: &CacheConfig) -> Self {
        Self {
            origin: GridCoord::round(plan.origin(), config.coord_decimals),
            destination: GridCoord::round(plan.destination(), config.coord_decimals),
            mode: plan.mode(),
            poi: plan.anchor_poi(),
            direct: plan.is_direct(),
            bucket: config.time_bucket(timestamp),
        }
    }
}

/// Error reading or writing a cache snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("cache snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cache snapshot {path} is malformed: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SnapshotError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        SnapshotError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        SnapshotError::Json {
            path: path.display().to_string(),
            source,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    key: CacheKey,
    result: TripResult,
}

/// Cache contents as written to disk.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    saved_at: DateTime<Utc>,
    entries: Vec<SnapshotEntry>,
}

/// Shared cache of resolved trips.
///
/// Cloning is cheap and clones share entries.
#[derive(Clone)]
pub struct TripCache {
    entries: MokaCache<CacheKey, TripResult>,
    config: Arc<CacheConfig>,
    snapshot_lock: Arc<Mutex<()>>,
}

impl TripCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        let entries = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self {
            entries,
            config: Arc::new(config),
            snapshot_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Key for `plan` under this cache's rounding and bucketing.
    pub fn key_for(&self, plan: &TripPlan, timestamp: DateTime<Utc>) -> CacheKey {
        CacheKey::for_plan(plan, timestamp, &self.config)
    }

    /// Get a cached result.
    pub async fn get(&self, key: &CacheKey) -> Option<TripResult> {
        self.entries.get(key).await
    }

    /// Insert a successful result. Failed results are ignored.
    pub async fn insert(&self, key: CacheKey, result: TripResult) {
        if result.success {
            self.entries.insert(key, result).await;
        }
    }

    /// Return the cached result for `key`, or run `resolve` and cache its
    /// success.
    ///
    /// At most one `resolve` runs per key at a time; concurrent callers wait
    /// for it and share its outcome. Failures are returned to every waiter
    /// and leave no entry behind.
    pub async fn get_or_resolve<Fut>(
        &self,
        key: CacheKey,
        resolve: Fut,
    ) -> Result<TripResult, Arc<FailureReason>>
    where
        Fut: Future<Output = Result<TripResult, FailureReason>>,
    {
        self.entries.try_get_with(key, resolve).await
    }

    /// Drop one entry.
    pub async fn invalidate(&self, key: &CacheKey) {
        self.entries.invalidate(key).await;
    }

    /// Number of cached entries (approximate until pending tasks run).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Flush pending maintenance so `entry_count` is exact.
    pub async fn sync(&self) {
        self.entries.run_pending_tasks().await;
    }

    /// Write every cached result to `path`, replacing any previous
    /// snapshot. Returns the number of entries written.
    ///
    /// Creates parent directories if they don't exist. The file is written
    /// next to `path` first and renamed into place.
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<usize, SnapshotError> {
        let path = path.as_ref();
        let _writer = self.snapshot_lock.lock().await;

        let mut entries: Vec<SnapshotEntry> = self
            .entries
            .iter()
            .filter(|(_, result)| result.success)
            .map(|(key, result)| SnapshotEntry { key: *key, result })
            .collect();
        entries.sort_by_key(|e| (e.key.bucket, e.key.mode, e.key.origin, e.key.destination));
        let count = entries.len();

        let snapshot = Snapshot {
            saved_at: Utc::now(),
            entries,
        };
        let json = serde_json::to_vec(&snapshot).map_err(|e| SnapshotError::json(path, e))?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SnapshotError::io(parent, e))?;
        }
        let staging = staging_path(path);
        tokio::fs::write(&staging, json)
            .await
            .map_err(|e| SnapshotError::io(&staging, e))?;
        tokio::fs::rename(&staging, path)
            .await
            .map_err(|e| SnapshotError::io(path, e))?;

        debug!(path = %path.display(), entries = count, "trip cache saved");
        Ok(count)
    }

    /// Load a snapshot written by [`save_snapshot`](Self::save_snapshot).
    ///
    /// A missing file, or one older than the cache TTL, loads nothing.
    /// Returns the number of entries loaded.
    pub async fn load_snapshot(&self, path: impl AsRef<Path>) -> Result<usize, SnapshotError> {
        let path = path.as_ref();
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(SnapshotError::io(path, e)),
        };
        let snapshot: Snapshot =
            serde_json::from_slice(&bytes).map_err(|e| SnapshotError::json(path, e))?;

        let age = (Utc::now() - snapshot.saved_at).to_std().unwrap_or_default();
        if age >= self.config.ttl {
            debug!(path = %path.display(), ?age, "trip cache snapshot expired");
            return Ok(0);
        }

        let mut loaded = 0;
        for SnapshotEntry { key, result } in snapshot.entries {
            if result.success {
                self.entries.insert(key, result).await;
                loaded += 1;
            }
        }
        debug!(path = %path.display(), entries = loaded, "trip cache loaded");
        Ok(loaded)
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
