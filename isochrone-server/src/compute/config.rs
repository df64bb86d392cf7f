//! Engine configuration.

use std::path::PathBuf;

use crate::isochrone::IsochroneConfig;
use crate::planner::DEFAULT_MAX_CANDIDATES;
use crate::sampling::SamplingConfig;

/// Default number of samples resolved concurrently.
pub const DEFAULT_CONCURRENCY: usize = 32;

/// Configuration for [`Engine`](super::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Samples resolved concurrently per computation.
    pub concurrency: usize,

    pub sampling: SamplingConfig,

    pub isochrone: IsochroneConfig,

    /// Run a second, refining sampling pass for network isochrones.
    pub refine: bool,

    /// Nearest POIs compared by walking distance per lookup.
    pub max_candidates: usize,

    /// Where the trip cache is saved after each computation.
    pub cache_snapshot: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            sampling: SamplingConfig::default(),
            isochrone: IsochroneConfig::default(),
            refine: true,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            cache_snapshot: None,
        }
    }
}

impl EngineConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_isochrone(mut self, isochrone: IsochroneConfig) -> Self {
        self.isochrone = isochrone;
        self
    }

    pub fn with_refinement(mut self, refine: bool) -> Self {
        self.refine = refine;
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    /// Save the trip cache to `path` after every computation that ran.
    pub fn with_cache_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_snapshot = Some(path.into());
        self
    }
}
