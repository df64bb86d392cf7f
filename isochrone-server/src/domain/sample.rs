//! Sample points and sampling strategies.

use std::fmt;

use geo::Point;
use serde::{Deserialize, Serialize};

/// How origins are chosen for a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Many origins spread across the study area, each travelling to its
    /// nearest transit stop.
    Network,
    /// Radial origins around a single station.
    Point,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Network => "network",
            Strategy::Point => "point",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named public transport station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRef {
    pub name: String,
    /// WGS84 position.
    pub location: Point<f64>,
}

impl StationRef {
    pub fn new(name: impl Into<String>, location: Point<f64>) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }
}

/// A candidate origin produced by a sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePoint {
    /// WGS84 position.
    pub location: Point<f64>,
    pub strategy: Strategy,
    /// The station a point-strategy sample radiates from.
    pub station: Option<StationRef>,
}

impl SamplePoint {
    /// A network-strategy sample.
    pub fn network(location: Point<f64>) -> Self {
        Self {
            location,
            strategy: Strategy::Network,
            station: None,
        }
    }

    /// A point-strategy sample around `station`.
    pub fn radial(location: Point<f64>, station: StationRef) -> Self {
        Self {
            location,
            strategy: Strategy::Point,
            station: Some(station),
        }
    }
}
