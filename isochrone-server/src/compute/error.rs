//! Whole-computation errors.

use crate::isochrone::IsochroneError;
use crate::persistence::PersistenceError;
use crate::stations::StationError;

use super::registry::AlreadyInProgress;
use super::request::RequestError;

/// Why a computation ended without a result.
#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    #[error("cancelled")]
    Cancelled,

    /// Every routed sample was refused by the routing API's rate limit
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error(transparent)]
    InProgress(#[from] AlreadyInProgress),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Station(#[from] StationError),

    #[error(transparent)]
    Isochrone(#[from] IsochroneError),

    #[error("failed to save isochrones: {0}")]
    Persistence(#[from] PersistenceError),
}

impl ComputeError {
    /// Expected outcomes go in the response's `reason`; everything else is
    /// reported as an `error`.
    pub fn is_reason(&self) -> bool {
        matches!(self, ComputeError::Cancelled | ComputeError::Isochrone(_))
    }
}
