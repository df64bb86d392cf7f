//! Station lookup errors.

/// Errors from the station directory.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StationError {
    /// No station with this name
    #[error("unknown station: {0}")]
    Unknown(String),

    /// Coordinates outside WGS84 range
    #[error("station {name} has invalid coordinates ({lon}, {lat})")]
    InvalidLocation { name: String, lon: f64, lat: f64 },
}
