//! Mock routing backend for running without API access.
//!
//! Prices trips from straight-line distance and a nominal speed per
//! vehicle, counts calls, and can be scripted to answer with rate limits
//! or to respond slowly.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::domain::{LocalProjection, Mode};

use super::RoutingBackend;
use super::decode::TripResponse;
use super::error::RoutingError;
use super::request::TripQuery;

/// Fixed overhead added to every non-walking trip (unlock, parking).
const ACCESS_OVERHEAD_SECS: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Script {
    Normal,
    /// The first `n` calls are rate limited.
    RateLimitFirst(usize),
    AlwaysRateLimited,
    NoTrip,
}

/// Deterministic stand-in for the OJP API.
///
/// Cloning shares the call counter.
#[derive(Debug, Clone)]
pub struct MockRouter {
    calls: Arc<AtomicUsize>,
    script: Script,
    delay: Duration,
    stations: Vec<String>,
}

impl Default for MockRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRouter {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            script: Script::Normal,
            delay: Duration::ZERO,
            stations: Vec::new(),
        }
    }

    /// Answer the first `n` calls with HTTP 429.
    pub fn rate_limit_first(mut self, n: usize) -> Self {
        self.script = Script::RateLimitFirst(n);
        self
    }

    /// Answer every call with HTTP 429.
    pub fn always_rate_limited(mut self) -> Self {
        self.script = Script::AlwaysRateLimited;
        self
    }

    /// Answer every call with "no trip found".
    pub fn no_trip(mut self) -> Self {
        self.script = Script::NoTrip;
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Station names reported on every trip.
    pub fn with_stations(mut self, names: &[&str]) -> Self {
        self.stations = names.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Number of calls received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn speed_mps(mode: Mode) -> f64 {
        match mode.vehicle() {
            Mode::Walk => 4.0 / 3.6,
            Mode::SelfDriveCar | Mode::CarSharing => 30.0 / 3.6,
            _ => 15.0 / 3.6,
        }
    }

    fn respond(&self, query: &TripQuery) -> TripResponse {
        let projection = LocalProjection::new(query.origin);
        let distance = projection.distance_m(query.origin, query.destination);
        let vehicle = query.mode.vehicle();

        let mut duration_secs = distance / Self::speed_mps(query.mode);
        let mut used_modes = Vec::new();
        if vehicle != Mode::Walk {
            duration_secs += ACCESS_OVERHEAD_SECS;
            if query.mode.is_rental() {
                used_modes.push(Mode::Walk.as_str().to_string());
            }
        }
        used_modes.push(vehicle.as_str().to_string());

        TripResponse {
            duration_secs: duration_secs.round(),
            used_modes,
            station_names: self.stations.clone(),
        }
    }
}

impl RoutingBackend for MockRouter {
    async fn trip(&self, query: &TripQuery) -> Result<TripResponse, RoutingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.script {
            Script::AlwaysRateLimited => Err(RoutingError::RateLimited),
            Script::RateLimitFirst(n) if call < n => Err(RoutingError::RateLimited),
            Script::NoTrip => Err(RoutingError::NoTripFound),
            _ => Ok(self.respond(query)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::request::TimeConstraint;
    use chrono::Utc;
    use geo::Point;

    fn query(mode: Mode) -> TripQuery {
        let proj = LocalProjection::new(Point::new(8.54, 47.37));
        TripQuery::new(
            proj.origin(),
            proj.to_geographic(Point::new(3000.0, 4000.0)),
            mode,
            TimeConstraint::DepartAt(Utc::now()),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn prices_by_distance() {
        let mock = MockRouter::new();
        let walk = mock.trip(&query(Mode::Walk)).await.unwrap();
        // 5 km at 4 km/h
        assert!((walk.duration_secs - 4500.0).abs() <= 1.0);
        assert_eq!(walk.used_modes, vec!["walk"]);

        let rental = mock.trip(&query(Mode::BicycleRental)).await.unwrap();
        assert!((rental.duration_secs - 1320.0).abs() <= 1.0);
        assert_eq!(rental.used_modes, vec!["walk", "cycle"]);
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn scripted_rate_limits() {
        let mock = MockRouter::new().rate_limit_first(2);
        assert!(mock.trip(&query(Mode::Cycle)).await.unwrap_err().is_rate_limited());
        assert!(mock.trip(&query(Mode::Cycle)).await.unwrap_err().is_rate_limited());
        assert!(mock.trip(&query(Mode::Cycle)).await.is_ok());

        let shared = mock.clone();
        assert_eq!(shared.calls(), 3);
    }

    #[tokio::test]
    async fn no_trip_script() {
        let mock = MockRouter::new().no_trip();
        assert!(matches!(
            mock.trip(&query(Mode::Walk)).await,
            Err(RoutingError::NoTripFound)
        ));
    }
}
