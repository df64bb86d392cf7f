//! Leg planner.
//!
//! Answers "which legs does this sample need under this mode?". Own-vehicle
//! modes park near the station, rental modes pick up and drop off at the
//! rental POIs nearest each end, walking needs no POI at all.
//!
//! Planning is pure: it reads the immutable POI index and never touches the
//! network, so it runs inline in the worker tasks.

mod legs;

pub use legs::{DEFAULT_MAX_CANDIDATES, LegPlanner, PlanError};
