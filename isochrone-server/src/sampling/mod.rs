//! Sample point generation.
//!
//! Network computations spread origins across the whole study area;
//! point computations place them on rings around a station. Both are
//! seeded, so equal inputs always produce equal samples.

mod config;
mod network;
mod radial;

pub use config::{RadialConfig, SamplingConfig};
pub use network::NetworkSampler;
pub use radial::RadialSampler;
