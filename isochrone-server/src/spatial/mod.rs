//! Spatial lookups.
//!
//! The POI index answers nearest-k queries per mode and category; the
//! study area decides which coordinates may be sampled at all.

mod area;
mod error;
mod index;

pub use area::StudyArea;
pub use error::SpatialError;
pub use index::{PoiIndex, SpatialConfig};
