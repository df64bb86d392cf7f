//! Spatial lookup errors.

use crate::domain::{Mode, PoiCategory};

/// Errors from the POI index and study area.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpatialError {
    /// No POI of the category serves the mode within the search radius.
    /// The mode is unusable at this origin; callers drop the sample.
    #[error("no {category} POI for {mode} within {radius_m} m")]
    NoCandidate {
        category: PoiCategory,
        mode: Mode,
        radius_m: f64,
    },

    /// The study area boundary has no extent
    #[error("study area boundary is empty")]
    EmptyBoundary,
}
