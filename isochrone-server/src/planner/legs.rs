//! Leg composition per mode.
//!
//! Turns a (mode, sample) pair into an ordered list of legs, resolving the
//! POIs the mode depends on through the spatial index.

use geo::Point;
use tracing::trace;

use crate::domain::{
    DomainError, FailureReason, Leg, Mode, PoiCategory, PoiId, SamplePoint, Strategy, TripPlan,
};
use crate::routing::WalkPricer;
use crate::spatial::{PoiIndex, SpatialError};

/// Transit stops are reached on foot.
const STOP_ACCESS_MODE: Mode = Mode::Walk;

/// Nearest POIs compared by walking distance per lookup.
pub const DEFAULT_MAX_CANDIDATES: usize = 3;

/// Error from leg planning.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlanError {
    /// A required POI is out of reach; the mode is unusable at this origin
    #[error(transparent)]
    NoCandidate(#[from] SpatialError),

    /// Point-strategy sample without its station
    #[error("point sample has no associated station")]
    MissingStation,

    /// Planned legs violate a domain invariant
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl PlanError {
    /// Whether the mode is simply unusable at this sample, as opposed to a
    /// malformed sample or plan.
    pub fn is_no_candidate(&self) -> bool {
        matches!(self, PlanError::NoCandidate(_))
    }

    /// The per-sample failure this error resolves to.
    pub fn failure(&self) -> FailureReason {
        match self {
            PlanError::NoCandidate(_) => FailureReason::NoCandidate,
            other => FailureReason::Planning(other.to_string()),
        }
    }
}

/// Where a trip starts and ends, and which end is the station.
struct Endpoints {
    start: Point<f64>,
    end: Point<f64>,
    station_at_end: bool,
}

/// Builds trip plans from samples.
///
/// Deterministic: equal inputs and an equal index always produce equal
/// plans, because index lookups tie-break on POI id.
///
/// With a walking network, each POI lookup takes the `max_candidates`
/// nearest POIs by air and keeps the one with the shortest walk to the
/// point it serves. Without one, the nearest POI by air is used.
pub struct LegPlanner<'a> {
    index: &'a PoiIndex,
    walk: Option<&'a WalkPricer>,
    max_candidates: usize,
}

impl<'a> LegPlanner<'a> {
    pub fn new(index: &'a PoiIndex) -> Self {
        Self {
            index,
            walk: None,
            max_candidates: 1,
        }
    }

    /// Rank up to `max_candidates` POIs per lookup by walking distance.
    pub fn with_walk(mut self, walk: &'a WalkPricer, max_candidates: usize) -> Self {
        self.walk = Some(walk);
        self.max_candidates = max_candidates.max(1);
        self
    }

    /// Plan the legs for `mode` from `sample`.
    ///
    /// Network samples travel to their nearest transit stop; point samples
    /// are reached from their station.
    ///
    /// - `walk`: one walking leg.
    /// - `cycle`, `self-drive-car`: ride to (or from) the parking nearest
    ///   the station and walk the rest.
    /// - rental modes: walk to the rental POI nearest the start, ride to
    ///   the rental POI nearest the end, walk on. If both resolve to the
    ///   same POI there is nothing to ride and the trip is walked.
    pub fn plan(&self, mode: Mode, sample: &SamplePoint) -> Result<TripPlan, PlanError> {
        let ends = self.endpoints(sample)?;
        let (start, end) = (ends.start, ends.end);

        let plan = match mode {
            Mode::Walk => TripPlan::new(mode, vec![Leg::walk(start, end)?], Vec::new())?,

            Mode::Cycle | Mode::SelfDriveCar => {
                let station = if ends.station_at_end { end } else { start };
                let parking = self.nearest(station, PoiCategory::Parking, mode)?;
                let legs = if ends.station_at_end {
                    vec![
                        Leg::new(mode.vehicle(), start, parking.1)?,
                        Leg::walk(parking.1, end)?,
                    ]
                } else {
                    vec![
                        Leg::walk(start, parking.1)?,
                        Leg::new(mode.vehicle(), parking.1, end)?,
                    ]
                };
                TripPlan::new(mode, legs, vec![parking.0])?
            }

            Mode::BicycleRental | Mode::EscooterRental | Mode::CarSharing => {
                let pickup = self.nearest(start, PoiCategory::Rental, mode)?;
                let dropoff = self.nearest(end, PoiCategory::Rental, mode)?;
                if pickup.0 == dropoff.0 {
                    TripPlan::new(mode, vec![Leg::walk(start, end)?], vec![pickup.0])?
                } else {
                    let legs = vec![
                        Leg::walk(start, pickup.1)?,
                        Leg::new(mode.vehicle(), pickup.1, dropoff.1)?,
                        Leg::walk(dropoff.1, end)?,
                    ];
                    TripPlan::new(mode, legs, vec![pickup.0, dropoff.0])?
                }
            }
        };

        trace!(%mode, legs = plan.legs().len(), "planned trip");
        Ok(plan)
    }

    /// A single multimodal request between the sample and its station,
    /// leaving leg composition to the routing API.
    pub fn plan_direct(&self, mode: Mode, sample: &SamplePoint) -> Result<TripPlan, PlanError> {
        let ends = self.endpoints(sample)?;
        Ok(TripPlan::direct(mode, ends.start, ends.end)?)
    }

    fn endpoints(&self, sample: &SamplePoint) -> Result<Endpoints, PlanError> {
        match sample.strategy {
            Strategy::Network => {
                let stop = self.nearest(sample.location, PoiCategory::Stop, STOP_ACCESS_MODE)?;
                Ok(Endpoints {
                    start: sample.location,
                    end: stop.1,
                    station_at_end: true,
                })
            }
            Strategy::Point => {
                let station = sample.station.as_ref().ok_or(PlanError::MissingStation)?;
                Ok(Endpoints {
                    start: station.location,
                    end: sample.location,
                    station_at_end: false,
                })
            }
        }
    }

    fn nearest(
        &self,
        point: Point<f64>,
        category: PoiCategory,
        mode: Mode,
    ) -> Result<(PoiId, Point<f64>), PlanError> {
        let walk = self.walk.filter(|w| w.has_graph());
        let k = if walk.is_some() { self.max_candidates } else { 1 };
        let found = self.index.nearest(point, category, mode, k)?;

        let best = match walk {
            Some(walk) => found.into_iter().min_by_key(|poi| {
                let mm = (walk.distance_m(point, poi.location) * 1000.0).round() as i64;
                (mm, poi.id)
            }),
            None => found.into_iter().next(),
        };
        // nearest() never returns an empty list
        let poi = best.ok_or(SpatialError::NoCandidate {
            category,
            mode,
            radius_m: 0.0,
        })?;
        Ok((poi.id, poi.location))
    }
}
