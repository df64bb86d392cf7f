//! Trip plans and their resolved results.

use geo::Point;
use serde::{Deserialize, Serialize};

use super::{DomainError, Leg, Mode, PoiId};

/// An ordered, contiguous sequence of legs for one sample.
///
/// Built by the leg planner and never mutated afterwards.
///
/// # Invariants
///
/// - At least one leg.
/// - Each leg starts where the previous one ended.
#[derive(Debug, Clone, PartialEq)]
pub struct TripPlan {
    mode: Mode,
    legs: Vec<Leg>,
    pois: Vec<PoiId>,
    direct: bool,
}

impl TripPlan {
    /// Construct a plan from explicit legs.
    ///
    /// `pois` lists the POIs the plan passes through, in travel order.
    pub fn new(mode: Mode, legs: Vec<Leg>, pois: Vec<PoiId>) -> Result<Self, DomainError> {
        if legs.is_empty() {
            return Err(DomainError::EmptyPlan);
        }
        for pair in legs.windows(2) {
            if pair[0].to() != pair[1].from() {
                return Err(DomainError::DisconnectedLegs);
            }
        }
        Ok(Self {
            mode,
            legs,
            pois,
            direct: false,
        })
    }

    /// A single multimodal request from `from` to `to`, leaving leg
    /// composition to the routing API.
    pub fn direct(mode: Mode, from: Point<f64>, to: Point<f64>) -> Result<Self, DomainError> {
        let leg = Leg::new(mode, from, to)?;
        Ok(Self {
            mode,
            legs: vec![leg],
            pois: Vec::new(),
            direct: true,
        })
    }

    /// The requested mode (not necessarily the mode of every leg).
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn pois(&self) -> &[PoiId] {
        &self.pois
    }

    /// The first POI on the trip, used to key cached results.
    pub fn anchor_poi(&self) -> Option<PoiId> {
        self.pois.first().copied()
    }

    /// Start of the first leg.
    pub fn origin(&self) -> Point<f64> {
        self.legs[0].from()
    }

    /// End of the last leg.
    pub fn destination(&self) -> Point<f64> {
        self.legs[self.legs.len() - 1].to()
    }

    /// Whether this plan is a single direct multimodal request.
    pub fn is_direct(&self) -> bool {
        self.direct
    }
}

/// Why a sample could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    #[error("no candidate POI within reach")]
    NoCandidate,

    #[error("rate limited by routing API")]
    RateLimited,

    #[error("routing API error: {0}")]
    ExternalApi(String),

    #[error("no trip found")]
    NoTrip,

    /// The sample could not be planned at all
    #[error("trip planning failed: {0}")]
    Planning(String),

    #[error("cancelled")]
    Cancelled,
}

/// Outcome of resolving one trip plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripResult {
    /// Door-to-door travel time in seconds. Zero for failed results.
    pub duration_secs: f64,

    /// Modes actually used, in order of first use.
    pub used_modes: Vec<String>,

    /// Public transport stations passed through, in order of first use.
    pub station_names: Vec<String>,

    pub success: bool,

    /// Set exactly when `success` is false.
    pub failure: Option<FailureReason>,
}

impl TripResult {
    /// A successful result.
    pub fn resolved(duration_secs: f64, used_modes: Vec<String>, station_names: Vec<String>) -> Self {
        Self {
            duration_secs,
            used_modes,
            station_names,
            success: true,
            failure: None,
        }
    }

    /// A failed result.
    pub fn failed(reason: FailureReason) -> Self {
        Self {
            duration_secs: 0.0,
            used_modes: Vec::new(),
            station_names: Vec::new(),
            success: false,
            failure: Some(reason),
        }
    }

    /// Travel time in minutes.
    pub fn duration_mins(&self) -> f64 {
        self.duration_secs / 60.0
    }

    /// Append the contribution of another leg.
    pub fn absorb(&mut self, duration_secs: f64, modes: &[String], stations: &[String]) {
        self.duration_secs += duration_secs;
        push_unique(&mut self.used_modes, modes);
        push_unique(&mut self.station_names, stations);
    }
}

/// Extend `into` with the items of `from` it does not already contain.
pub(crate) fn push_unique(into: &mut Vec<String>, from: &[String]) {
    for item in from {
        if !into.contains(item) {
            into.push(item.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point<f64> {
        Point::new(x, y)
    }

    #[test]
    fn empty_plan_rejected() {
        assert!(matches!(
            TripPlan::new(Mode::Walk, vec![], vec![]),
            Err(DomainError::EmptyPlan)
        ));
    }

    #[test]
    fn disconnected_legs_rejected() {
        let legs = vec![
            Leg::walk(p(8.0, 47.0), p(8.1, 47.0)).unwrap(),
            Leg::new(Mode::Cycle, p(8.2, 47.0), p(8.3, 47.0)).unwrap(),
        ];
        assert!(matches!(
            TripPlan::new(Mode::BicycleRental, legs, vec![]),
            Err(DomainError::DisconnectedLegs)
        ));
    }

    #[test]
    fn plan_endpoints_and_anchor() {
        let legs = vec![
            Leg::walk(p(8.0, 47.0), p(8.1, 47.0)).unwrap(),
            Leg::new(Mode::Cycle, p(8.1, 47.0), p(8.2, 47.0)).unwrap(),
            Leg::walk(p(8.2, 47.0), p(8.3, 47.0)).unwrap(),
        ];
        let plan = TripPlan::new(Mode::BicycleRental, legs, vec![PoiId(4), PoiId(9)]).unwrap();

        assert_eq!(plan.origin(), p(8.0, 47.0));
        assert_eq!(plan.destination(), p(8.3, 47.0));
        assert_eq!(plan.anchor_poi(), Some(PoiId(4)));
        assert!(!plan.is_direct());
    }

    #[test]
    fn direct_plan_has_single_leg() {
        let plan = TripPlan::direct(Mode::CarSharing, p(8.0, 47.0), p(8.1, 47.1)).unwrap();
        assert!(plan.is_direct());
        assert_eq!(plan.legs().len(), 1);
        assert_eq!(plan.legs()[0].mode(), Mode::CarSharing);
        assert_eq!(plan.anchor_poi(), None);
    }

    #[test]
    fn absorb_deduplicates() {
        let mut result = TripResult::resolved(60.0, vec!["walk".into()], vec![]);
        result.absorb(
            120.0,
            &["cycle".into(), "walk".into()],
            &["Zürich HB".into()],
        );
        assert_eq!(result.duration_secs, 180.0);
        assert_eq!(result.used_modes, vec!["walk", "cycle"]);
        assert_eq!(result.station_names, vec!["Zürich HB"]);
        assert_eq!(result.duration_mins(), 3.0);
    }

    #[test]
    fn failure_reason_display() {
        assert_eq!(FailureReason::RateLimited.to_string(), "rate limited by routing API");
        assert_eq!(
            FailureReason::ExternalApi("HTTP 500".into()).to_string(),
            "routing API error: HTTP 500"
        );
    }
}
