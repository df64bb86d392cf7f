//! Public transport stations.
//!
//! Maps station names to coordinates for point isochrones, and supplies
//! the transit stops that network-strategy trips head for.

mod directory;
mod error;

pub use directory::{StationDirectory, StationRecord};
pub use error::StationError;
