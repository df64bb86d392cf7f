//! Compute responses.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{IsochroneBand, Mode, Strategy};

/// Terminal status of a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    /// A stored result was reused without recomputation.
    Skipped,
    Failed,
}

/// The record of one finished computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeResponse {
    pub status: Status,
    #[serde(rename = "type")]
    pub strategy: Strategy,
    pub station: Option<String>,
    pub mode: Mode,
    pub reason: Option<String>,
    pub error: Option<String>,
    /// Wall-clock seconds.
    pub runtime: f64,
    /// Point strategy only.
    #[serde(default)]
    pub used_modes: Vec<String>,
    /// Point strategy only.
    #[serde(default)]
    pub station_names: Vec<String>,
    /// The computed bands; not part of the wire format.
    #[serde(skip)]
    pub bands: Vec<IsochroneBand>,
}

impl ComputeResponse {
    fn base(status: Status, mode: Mode, strategy: Strategy, station: Option<String>, runtime: Duration) -> Self {
        Self {
            status,
            strategy,
            station,
            mode,
            reason: None,
            error: None,
            runtime: runtime.as_secs_f64(),
            used_modes: Vec::new(),
            station_names: Vec::new(),
            bands: Vec::new(),
        }
    }

    pub fn success(
        mode: Mode,
        strategy: Strategy,
        station: Option<String>,
        runtime: Duration,
        bands: Vec<IsochroneBand>,
    ) -> Self {
        Self {
            bands,
            ..Self::base(Status::Success, mode, strategy, station, runtime)
        }
    }

    pub fn skipped(mode: Mode, strategy: Strategy, station: Option<String>, runtime: Duration) -> Self {
        Self {
            reason: Some("already computed for this time window".to_string()),
            ..Self::base(Status::Skipped, mode, strategy, station, runtime)
        }
    }

    /// A failure explained to the caller through `reason`.
    pub fn failed_reason(
        mode: Mode,
        strategy: Strategy,
        station: Option<String>,
        runtime: Duration,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::base(Status::Failed, mode, strategy, station, runtime)
        }
    }

    /// A failure caused by an error.
    pub fn failed_error(
        mode: Mode,
        strategy: Strategy,
        station: Option<String>,
        runtime: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::base(Status::Failed, mode, strategy, station, runtime)
        }
    }

    /// Attach the modes and stations the trips used.
    pub fn with_trip_details(mut self, used_modes: Vec<String>, station_names: Vec<String>) -> Self {
        self.used_modes = used_modes;
        self.station_names = station_names;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}
