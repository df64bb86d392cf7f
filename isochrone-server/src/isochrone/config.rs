//! Isochrone extraction configuration.

/// Configuration for band extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct IsochroneConfig {
    /// Width of each time band in minutes.
    pub band_width_mins: f64,

    /// Fewer successful samples than this cannot be contoured.
    pub min_samples: usize,

    /// Exponent on inverse distance weights.
    pub idw_power: f64,

    /// Samples weighted per grid cell.
    pub idw_neighbours: usize,

    /// Cells with no sample within this many metres stay unassigned.
    pub max_interpolation_m: f64,

    /// Side length of a contouring grid cell in metres.
    pub cell_size_m: f64,

    /// Angular sectors for radial contouring.
    pub sectors: usize,
}

impl Default for IsochroneConfig {
    fn default() -> Self {
        Self {
            band_width_mins: 5.0,
            min_samples: 4,
            idw_power: 2.0,
            idw_neighbours: 8,
            max_interpolation_m: 1_500.0,
            cell_size_m: 250.0,
            sectors: 16,
        }
    }
}

impl IsochroneConfig {
    /// Set band width.
    pub fn with_band_width(mut self, mins: f64) -> Self {
        self.band_width_mins = mins;
        self
    }

    /// Set the contouring grid cell size.
    pub fn with_cell_size(mut self, metres: f64) -> Self {
        self.cell_size_m = metres;
        self
    }

    /// Set the minimum number of successful samples.
    pub fn with_min_samples(mut self, n: usize) -> Self {
        self.min_samples = n;
        self
    }
}
