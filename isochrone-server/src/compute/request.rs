//! Compute requests and their validation.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::domain::{InvalidMode, Mode, Strategy};

use super::registry::ComputationKey;

/// Arrival time used when a request gives none: this long after `timestamp`.
const DEFAULT_ARRIVAL_OFFSET_MINS: i64 = 60;

/// A compute request as received, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawComputeRequest {
    pub mode: String,
    #[serde(default)]
    pub network_isochrones: bool,
    #[serde(default)]
    pub input_station: Option<String>,
    #[serde(default)]
    pub performance: bool,
    #[serde(default)]
    pub arrival_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub force_update: bool,
}

/// Why a request was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Mode(#[from] InvalidMode),

    #[error("input_station is required for point isochrones")]
    MissingStation,
}

/// Which isochrones to compute.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Isochrones over the whole study area.
    Network,
    /// Isochrones around one station; `performance` asks for single direct
    /// trips on a coarser grid.
    Point { station: String, performance: bool },
}

/// A validated compute request.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeRequest {
    pub mode: Mode,
    pub target: Target,
    pub arrival_time: DateTime<Utc>,
    /// Anchor of the cache and persistence time bucket.
    pub timestamp: DateTime<Utc>,
    pub force_update: bool,
}

impl RawComputeRequest {
    /// Validate, filling in defaults relative to `now`.
    ///
    /// `performance` only applies to point isochrones and is ignored for
    /// network ones.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ComputeRequest, RequestError> {
        let mode = Mode::parse(&self.mode)?;
        let station = self
            .input_station
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let target = if self.network_isochrones {
            Target::Network
        } else {
            Target::Point {
                station: station.ok_or(RequestError::MissingStation)?,
                performance: self.performance,
            }
        };

        let timestamp = self.timestamp.unwrap_or(now);
        let arrival_time = self
            .arrival_time
            .unwrap_or(timestamp + Duration::minutes(DEFAULT_ARRIVAL_OFFSET_MINS));

        Ok(ComputeRequest {
            mode,
            target,
            arrival_time,
            timestamp,
            force_update: self.force_update,
        })
    }
}

impl ComputeRequest {
    /// A network request with default times.
    pub fn network(mode: Mode, now: DateTime<Utc>) -> Self {
        Self {
            mode,
            target: Target::Network,
            arrival_time: now + Duration::minutes(DEFAULT_ARRIVAL_OFFSET_MINS),
            timestamp: now,
            force_update: false,
        }
    }

    /// A point request with default times.
    pub fn point(mode: Mode, station: impl Into<String>, performance: bool, now: DateTime<Utc>) -> Self {
        Self {
            target: Target::Point {
                station: station.into(),
                performance,
            },
            ..Self::network(mode, now)
        }
    }

    pub fn with_force_update(mut self, force_update: bool) -> Self {
        self.force_update = force_update;
        self
    }

    pub fn strategy(&self) -> Strategy {
        match self.target {
            Target::Network => Strategy::Network,
            Target::Point { .. } => Strategy::Point,
        }
    }

    pub fn station(&self) -> Option<&str> {
        match &self.target {
            Target::Network => None,
            Target::Point { station, .. } => Some(station),
        }
    }

    pub fn is_performance(&self) -> bool {
        matches!(self.target, Target::Point { performance: true, .. })
    }

    /// Identity used to refuse duplicate concurrent computations.
    pub fn computation_key(&self) -> ComputationKey {
        ComputationKey {
            mode: self.mode,
            strategy: self.strategy(),
            station: self.station().map(str::to_string),
        }
    }
}
