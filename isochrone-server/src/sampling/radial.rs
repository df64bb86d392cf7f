//! Radial sampling around a station.

use std::f64::consts::{FRAC_PI_4, PI, TAU};

use geo::Point;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::domain::{SamplePoint, StationRef};
use crate::spatial::StudyArea;

use super::config::RadialConfig;

/// Places samples on concentric rings around a station.
///
/// Ring `i` of `n` lies at `i / n * max_radius` and holds
/// `base_points * (1 + i / 2)` points, rotated by a random shift of up to
/// ±π/5 and jittered by up to `jitter_m` on each axis. Four extra points sit
/// on the diagonals at a tenth of the radius. Points outside the study area
/// or inside the exclusion mask are dropped. The result is thinned to
/// `max_points - 1` and the station itself is always appended last.
pub struct RadialSampler<'a> {
    area: &'a StudyArea,
    seed: u64,
}

impl<'a> RadialSampler<'a> {
    pub fn new(area: &'a StudyArea, seed: u64) -> Self {
        Self { area, seed }
    }

    pub fn sample(&self, station: &StationRef, config: &RadialConfig) -> Vec<SamplePoint> {
        let projection = self.area.projection();
        let center = projection.to_metric(station.location);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut points: Vec<Point<f64>> = Vec::new();

        let inner = config.max_radius_m / 10.0;
        for k in 0..4 {
            let angle = FRAC_PI_4 + k as f64 * PI / 2.0;
            points.push(offset(center, inner, angle));
        }

        let rings = config.num_rings.max(1);
        for i in 1..=rings {
            let radius = i as f64 / rings as f64 * config.max_radius_m;
            let count = config.base_points * (1 + i / 2);
            let shift = rng.random_range(-PI / 5.0..PI / 5.0);
            for j in 0..count {
                let angle = (j as f64 / count as f64 * TAU + shift).rem_euclid(TAU);
                let base = offset(center, radius, angle);
                let (jx, jy) = if config.jitter_m > 0.0 {
                    (
                        rng.random_range(-config.jitter_m..config.jitter_m),
                        rng.random_range(-config.jitter_m..config.jitter_m),
                    )
                } else {
                    (0.0, 0.0)
                };
                points.push(Point::new(base.x() + jx, base.y() + jy));
            }
        }

        points.retain(|p| self.area.contains_metric(*p));
        let points = thin(points, config.max_points.saturating_sub(1));
        debug!(
            station = %station.name,
            count = points.len() + 1,
            "radial samples drawn"
        );

        points
            .into_iter()
            .map(|p| SamplePoint::radial(projection.to_geographic(p), station.clone()))
            .chain(std::iter::once(SamplePoint::radial(
                station.location,
                station.clone(),
            )))
            .collect()
    }
}

fn offset(center: Point<f64>, radius: f64, angle: f64) -> Point<f64> {
    Point::new(
        center.x() + radius * angle.cos(),
        center.y() + radius * angle.sin(),
    )
}

/// Keep `keep` points spread evenly through the original order.
fn thin(points: Vec<Point<f64>>, keep: usize) -> Vec<Point<f64>> {
    let len = points.len();
    if len <= keep {
        return points;
    }
    (0..keep).map(|j| points[j * len / keep]).collect()
}
