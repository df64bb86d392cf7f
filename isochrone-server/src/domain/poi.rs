//! Points of interest: parking lots, rental stations and transit stops.

use std::collections::BTreeSet;
use std::fmt;

use geo::Point;
use serde::{Deserialize, Serialize};

use super::mode::Mode;

/// Stable identifier of a POI.
///
/// Ordering is used as the tie-break when two POIs are equally near.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoiId(pub u64);

impl fmt::Display for PoiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "poi#{}", self.0)
    }
}

/// What a POI offers to a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoiCategory {
    Parking,
    Rental,
    Stop,
}

impl fmt::Display for PoiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PoiCategory::Parking => "parking",
            PoiCategory::Rental => "rental",
            PoiCategory::Stop => "stop",
        })
    }
}

/// An immutable point of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct Poi {
    pub id: PoiId,

    /// Display name, if the dataset provides one.
    pub name: Option<String>,

    /// WGS84 position (x = longitude, y = latitude).
    pub location: Point<f64>,

    pub category: PoiCategory,

    /// Modes this POI can serve.
    pub modes: BTreeSet<Mode>,
}

impl Poi {
    /// Create a POI serving the given modes.
    pub fn new(
        id: PoiId,
        location: Point<f64>,
        category: PoiCategory,
        modes: impl IntoIterator<Item = Mode>,
    ) -> Self {
        Self {
            id,
            name: None,
            location,
            category,
            modes: modes.into_iter().collect(),
        }
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether this POI can serve `mode`.
    pub fn serves(&self, mode: Mode) -> bool {
        self.modes.contains(&mode)
    }
}
