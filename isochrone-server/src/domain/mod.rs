//! Domain types for the isochrone engine.
//!
//! This module contains the core model: travel modes, points of interest,
//! sample points, trip plans and their results, and isochrone bands.
//! Types that carry invariants enforce them at construction time.

mod band;
mod coords;
mod error;
mod leg;
mod mode;
mod poi;
mod sample;
mod trip;

pub use band::{IsochroneBand, TimeBand};
pub use coords::{GridCoord, LocalProjection, metric_distance};
pub use error::DomainError;
pub use leg::Leg;
pub use mode::{InvalidMode, Mode};
pub use poi::{Poi, PoiCategory, PoiId};
pub use sample::{SamplePoint, StationRef, Strategy};
pub use trip::{FailureReason, TripPlan, TripResult};
pub(crate) use trip::push_unique;
