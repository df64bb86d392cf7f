//! Trip legs.
//!
//! A `Leg` is one segment of a trip travelled in a single mode, from one
//! WGS84 position to another.

use geo::Point;
use serde::{Deserialize, Serialize};

use super::{DomainError, Mode};

/// One segment of a trip under a single mode.
///
/// # Invariants
///
/// - Both endpoints are finite coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    mode: Mode,
    from: Point<f64>,
    to: Point<f64>,
}

impl Leg {
    /// Construct a leg, rejecting non-finite coordinates.
    pub fn new(mode: Mode, from: Point<f64>, to: Point<f64>) -> Result<Self, DomainError> {
        for p in [from, to] {
            if !p.x().is_finite() || !p.y().is_finite() {
                return Err(DomainError::InvalidCoordinate(p.x(), p.y()));
            }
        }
        Ok(Self { mode, from, to })
    }

    /// A walking leg.
    pub fn walk(from: Point<f64>, to: Point<f64>) -> Result<Self, DomainError> {
        Self::new(Mode::Walk, from, to)
    }

    /// The mode this leg is travelled in.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn from(&self) -> Point<f64> {
        self.from
    }

    pub fn to(&self) -> Point<f64> {
        self.to
    }

    /// Whether this leg is priced locally rather than by the routing API.
    pub fn is_walk(&self) -> bool {
        self.mode == Mode::Walk
    }
}
