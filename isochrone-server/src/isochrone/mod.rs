//! Isochrone extraction.
//!
//! Turns resolved travel times into non-overlapping travel-time bands.
//!
//! Network samples are interpolated (inverse distance weighting) onto a
//! regular metric grid; each cell joins the innermost band whose upper
//! bound exceeds its time, and cells of one band are merged and clipped to
//! the study area. Point samples are contoured radially around their
//! station.

mod bands;
mod config;
mod error;
mod extractor;
mod idw;
mod network;
mod radial;

pub use bands::{band_index, time_bands};
pub use config::IsochroneConfig;
pub use error::IsochroneError;
pub use extractor::IsochroneExtractor;
pub use idw::IdwSurface;
