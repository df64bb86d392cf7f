//! Sampling configuration.

use crate::domain::Mode;

/// Configuration for network sampling.
#[derive(Debug, Clone)]
pub struct SamplingConfig {
    /// Seed for every random draw.
    pub seed: u64,

    /// Target spacing between network samples (metres).
    /// The sample count is the usable area divided by this squared.
    pub grid_size_m: f64,

    /// Samples drawn on top of the grid-density count. With a walking
    /// network they go to grid cells in proportion to the log of the
    /// cell's street junction count.
    pub extra_points: usize,

    /// Candidates closer than this to an accepted sample are rejected.
    pub min_separation_m: f64,

    /// Attempts allowed per requested sample before giving up.
    pub max_attempts_factor: usize,

    /// Refinement samples drawn where no band reached.
    pub refine_uncovered: usize,

    /// Refinement samples drawn inside the largest bands.
    pub refine_large: usize,
}

impl SamplingConfig {
    /// Number of network samples for a usable area of `area_m2`.
    pub fn target_count(&self, area_m2: f64) -> usize {
        self.grid_count(area_m2) + self.extra_points
    }

    /// Samples from the grid density alone, without `extra_points`.
    pub fn grid_count(&self, area_m2: f64) -> usize {
        let cell = self.grid_size_m * self.grid_size_m;
        if cell > 0.0 {
            (area_m2 / cell).ceil() as usize
        } else {
            0
        }
    }

    /// Use a different seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set grid spacing and extra points.
    pub fn with_density(mut self, grid_size_m: f64, extra_points: usize) -> Self {
        self.grid_size_m = grid_size_m;
        self.extra_points = extra_points;
        self
    }

    /// Set refinement sample counts.
    pub fn with_refinement(mut self, uncovered: usize, large: usize) -> Self {
        self.refine_uncovered = uncovered;
        self.refine_large = large;
        self
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            seed: 82,
            grid_size_m: 500.0,
            extra_points: 100,
            min_separation_m: 100.0,
            max_attempts_factor: 20,
            refine_uncovered: 100,
            refine_large: 150,
        }
    }
}

/// Ring layout for point sampling around a station.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialConfig {
    pub num_rings: usize,

    /// Points on the innermost ring; ring `i` gets `base_points * (1 + i / 2)`.
    pub base_points: usize,

    /// Uniform positional jitter applied to each ring point (metres).
    pub jitter_m: f64,

    /// Cap on returned samples, including the station itself.
    pub max_points: usize,

    /// Radius of the outermost ring (metres). Point isochrones are clipped to it.
    pub max_radius_m: f64,
}

impl RadialConfig {
    /// Defaults per mode; `performance` trades coverage for fewer requests.
    pub fn for_mode(mode: Mode, performance: bool) -> Self {
        let pick = |perf: usize, full: usize| if performance { perf } else { full };
        let pick_f = |perf: f64, full: f64| if performance { perf } else { full };

        match mode {
            Mode::Walk => Self {
                num_rings: pick(5, 6),
                base_points: 8,
                jitter_m: 50.0,
                max_points: pick(50, 75),
                max_radius_m: pick_f(1_500.0, 2_000.0),
            },
            Mode::Cycle | Mode::BicycleRental | Mode::EscooterRental => Self {
                num_rings: pick(6, 10),
                base_points: 7,
                jitter_m: 100.0,
                max_points: pick(50, 200),
                max_radius_m: pick_f(2_500.0, 7_500.0),
            },
            Mode::SelfDriveCar | Mode::CarSharing => Self {
                num_rings: pick(7, 12),
                base_points: 6,
                jitter_m: 150.0,
                max_points: pick(50, 250),
                max_radius_m: pick_f(5_000.0, 10_000.0),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = SamplingConfig::default();
        assert_eq!(config.seed, 82);
        assert_eq!(config.grid_size_m, 500.0);
        assert_eq!(config.extra_points, 100);
        assert_eq!(config.min_separation_m, 100.0);
        assert_eq!(config.max_attempts_factor, 20);
    }

    #[test]
    fn target_count_scales_with_area() {
        let config = SamplingConfig::default().with_density(500.0, 10);
        // 2 km x 2 km = 16 cells of 500 m
        assert_eq!(config.target_count(4_000_000.0), 26);
        assert_eq!(config.target_count(0.0), 10);
    }

    #[test]
    fn radial_defaults_per_mode() {
        let walk = RadialConfig::for_mode(Mode::Walk, false);
        assert_eq!(walk.num_rings, 6);
        assert_eq!(walk.max_points, 75);
        assert_eq!(walk.max_radius_m, 2_000.0);

        let bike = RadialConfig::for_mode(Mode::BicycleRental, true);
        assert_eq!(bike.num_rings, 6);
        assert_eq!(bike.base_points, 7);
        assert_eq!(bike.max_points, 50);
        assert_eq!(bike.max_radius_m, 2_500.0);

        let car = RadialConfig::for_mode(Mode::CarSharing, false);
        assert_eq!(car.num_rings, 12);
        assert_eq!(car.jitter_m, 150.0);
        assert_eq!(car.max_points, 250);
        assert_eq!(car.max_radius_m, 10_000.0);
    }
}
