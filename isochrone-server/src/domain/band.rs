//! Travel-time bands and the isochrone polygons built for them.

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

use super::{Mode, Strategy};

/// A half-open travel-time interval `[lower, upper)` in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeBand {
    pub lower_mins: f64,
    pub upper_mins: f64,
}

impl TimeBand {
    pub fn new(lower_mins: f64, upper_mins: f64) -> Self {
        Self {
            lower_mins,
            upper_mins,
        }
    }

    /// Whether `mins` falls inside the band.
    pub fn contains(&self, mins: f64) -> bool {
        self.lower_mins <= mins && mins < self.upper_mins
    }
}

/// One non-overlapping isochrone polygon for a (mode, strategy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsochroneBand {
    pub mode: Mode,
    pub strategy: Strategy,
    /// Inclusive lower bound in minutes.
    pub lower_bound: f64,
    /// Exclusive upper bound in minutes.
    pub upper_bound: f64,
    /// WGS84 geometry.
    pub polygon: MultiPolygon<f64>,
}

impl IsochroneBand {
    pub fn band(&self) -> TimeBand {
        TimeBand::new(self.lower_bound, self.upper_bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_is_half_open() {
        let band = TimeBand::new(5.0, 10.0);
        assert!(band.contains(5.0));
        assert!(band.contains(9.999));
        assert!(!band.contains(10.0));
        assert!(!band.contains(4.9));
    }
}
