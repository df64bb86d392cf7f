//! Travel modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::poi::PoiCategory;

/// Error returned when parsing an unknown mode string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown travel mode: {0}")]
pub struct InvalidMode(pub String);

/// A travel mode used to reach public transport.
///
/// The wire names match the routing API's individual-mode vocabulary
/// (`self-drive-car` keeps its hyphens, the rental modes use underscores).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "walk")]
    Walk,
    #[serde(rename = "cycle")]
    Cycle,
    #[serde(rename = "self-drive-car")]
    SelfDriveCar,
    #[serde(rename = "bicycle_rental")]
    BicycleRental,
    #[serde(rename = "escooter_rental")]
    EscooterRental,
    #[serde(rename = "car_sharing")]
    CarSharing,
}

impl Mode {
    /// Every mode, in declaration order.
    pub const ALL: [Mode; 6] = [
        Mode::Walk,
        Mode::Cycle,
        Mode::SelfDriveCar,
        Mode::BicycleRental,
        Mode::EscooterRental,
        Mode::CarSharing,
    ];

    /// Wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Walk => "walk",
            Mode::Cycle => "cycle",
            Mode::SelfDriveCar => "self-drive-car",
            Mode::BicycleRental => "bicycle_rental",
            Mode::EscooterRental => "escooter_rental",
            Mode::CarSharing => "car_sharing",
        }
    }

    /// Parse a wire name.
    pub fn parse(s: &str) -> Result<Self, InvalidMode> {
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| InvalidMode(s.to_string()))
    }

    /// Rental modes pick up and drop off a shared vehicle at rental POIs.
    pub fn is_rental(&self) -> bool {
        matches!(
            self,
            Mode::BicycleRental | Mode::EscooterRental | Mode::CarSharing
        )
    }

    /// Whether a trip in this mode must resolve a POI (parking or rental).
    pub fn needs_poi(&self) -> bool {
        !matches!(self, Mode::Walk)
    }

    /// The POI category this mode depends on, if any.
    pub fn poi_category(&self) -> Option<PoiCategory> {
        match self {
            Mode::Walk => None,
            Mode::Cycle | Mode::SelfDriveCar => Some(PoiCategory::Parking),
            Mode::BicycleRental | Mode::EscooterRental | Mode::CarSharing => {
                Some(PoiCategory::Rental)
            }
        }
    }

    /// The vehicle that is actually routed for the main leg.
    ///
    /// Rental bikes and scooters ride like a bicycle, shared cars drive like
    /// a private car.
    pub fn vehicle(&self) -> Mode {
        match self {
            Mode::BicycleRental | Mode::EscooterRental => Mode::Cycle,
            Mode::CarSharing => Mode::SelfDriveCar,
            other => *other,
        }
    }

    /// Name of the static dataset holding this mode's POIs.
    pub fn dataset(&self) -> Option<&'static str> {
        match self {
            Mode::Walk => None,
            Mode::Cycle => Some("bike-parking"),
            Mode::SelfDriveCar => Some("parking-facilities"),
            Mode::BicycleRental => Some("bike-rental"),
            Mode::EscooterRental => Some("escooter-rental"),
            Mode::CarSharing => Some("car-rental"),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = InvalidMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::parse(s)
    }
}
