//! Network sampling: origins spread over the study area.

use std::collections::BTreeMap;

use geo::{Area, BooleanOps, Contains, MultiPolygon, Point};
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstar::RTree;
use tracing::{debug, warn};

use crate::domain::{IsochroneBand, SamplePoint};
use crate::spatial::StudyArea;

use super::config::SamplingConfig;

/// Draws network-strategy samples with rejection sampling.
///
/// Candidates are drawn uniformly over the bounding rectangle and
/// rejected when they fall outside the boundary, inside the exclusion
/// mask, or within `min_separation_m` of an accepted sample. Sampling
/// stops at the requested count or after `max_attempts_factor * n`
/// attempts, whichever comes first.
///
/// Given street junctions, the `extra_points` are drawn adaptively
/// instead: a grid cell is picked with weight `ln(junctions in cell)` and
/// the candidate placed uniformly inside it.
pub struct NetworkSampler<'a> {
    area: &'a StudyArea,
    config: &'a SamplingConfig,
    junctions: &'a [Point<f64>],
}

impl<'a> NetworkSampler<'a> {
    pub fn new(area: &'a StudyArea, config: &'a SamplingConfig) -> Self {
        Self {
            area,
            config,
            junctions: &[],
        }
    }

    /// Weight extra samples by these street junctions (metric frame).
    pub fn with_junctions(mut self, junctions: &'a [Point<f64>]) -> Self {
        self.junctions = junctions;
        self
    }

    /// Samples at the configured density plus the extra points.
    pub fn sample(&self) -> Vec<SamplePoint> {
        let grid = self.config.grid_count(self.area.area_m2());
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut accepted = RTree::new();

        let mut points = self.draw(&mut rng, &mut accepted, grid, |rng| self.uniform(rng), |_| true);
        let extra = self.draw_extra(&mut rng, &mut accepted, self.config.extra_points);
        debug!(
            grid = points.len(),
            extra = extra.len(),
            adaptive = !self.junctions.is_empty(),
            "network samples drawn"
        );
        points.extend(extra);
        self.to_samples(points)
    }

    /// Up to `n` uniformly drawn samples.
    pub fn sample_n(&self, n: usize) -> Vec<SamplePoint> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut accepted = RTree::new();
        let points = self.draw(&mut rng, &mut accepted, n, |rng| self.uniform(rng), |_| true);
        debug!(requested = n, accepted = points.len(), "network samples drawn");
        self.to_samples(points)
    }

    /// Extra samples after a first extraction.
    ///
    /// Draws `refine_uncovered` samples where no band reached and
    /// `refine_large` samples inside the largest band, keeping clear of
    /// `existing` samples.
    pub fn refine(&self, bands: &[IsochroneBand], existing: &[SamplePoint]) -> Vec<SamplePoint> {
        let projection = self.area.projection();
        let metric_bands: Vec<MultiPolygon<f64>> = bands
            .iter()
            .map(|b| projection.polygons_to_metric(&b.polygon))
            .collect();

        let covered = metric_bands
            .iter()
            .fold(MultiPolygon::new(Vec::new()), |acc, mp| acc.union(mp));
        let largest = metric_bands
            .iter()
            .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
            .cloned()
            .unwrap_or_else(|| MultiPolygon::new(Vec::new()));

        let mut accepted: RTree<[f64; 2]> = RTree::bulk_load(
            existing
                .iter()
                .map(|s| {
                    let m = projection.to_metric(s.location);
                    [m.x(), m.y()]
                })
                .collect(),
        );

        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(1));
        let mut points = self.draw(
            &mut rng,
            &mut accepted,
            self.config.refine_uncovered,
            |rng| self.uniform(rng),
            |p| !covered.contains(p),
        );
        if !largest.0.is_empty() {
            points.extend(self.draw(
                &mut rng,
                &mut accepted,
                self.config.refine_large,
                |rng| self.uniform(rng),
                |p| largest.contains(p),
            ));
        }

        debug!(count = points.len(), "refinement samples drawn");
        self.to_samples(points)
    }

    /// Extra samples weighted by junction density, or uniform when no cell
    /// has a positive weight.
    fn draw_extra(&self, rng: &mut StdRng, accepted: &mut RTree<[f64; 2]>, n: usize) -> Vec<Point<f64>> {
        let cells = self.junction_cells();
        let Ok(weights) = WeightedIndex::new(cells.iter().map(|(_, w)| *w)) else {
            return self.draw(rng, accepted, n, |rng| self.uniform(rng), |_| true);
        };

        let min = self.area.bounds().min();
        let size = self.config.grid_size_m;
        self.draw(
            rng,
            accepted,
            n,
            |rng| {
                let (cx, cy) = cells[weights.sample(rng)].0;
                Point::new(
                    min.x + (cx as f64 + rng.random::<f64>()) * size,
                    min.y + (cy as f64 + rng.random::<f64>()) * size,
                )
            },
            |_| true,
        )
    }

    /// Grid cells holding junctions inside the study area, with weight
    /// `ln(count)`, in cell order. Cells with a single junction weigh 0.
    fn junction_cells(&self) -> Vec<((i64, i64), f64)> {
        let size = self.config.grid_size_m;
        if size <= 0.0 {
            return Vec::new();
        }
        let min = self.area.bounds().min();

        let mut counts: BTreeMap<(i64, i64), usize> = BTreeMap::new();
        for p in self.junctions {
            if !self.area.contains_metric(*p) {
                continue;
            }
            let cell = (
                ((p.x() - min.x) / size).floor() as i64,
                ((p.y() - min.y) / size).floor() as i64,
            );
            *counts.entry(cell).or_default() += 1;
        }

        counts
            .into_iter()
            .map(|(cell, count)| (cell, (count as f64).ln()))
            .filter(|(_, weight)| *weight > 0.0)
            .collect()
    }

    fn uniform(&self, rng: &mut StdRng) -> Point<f64> {
        let bounds = self.area.bounds();
        Point::new(
            rng.random_range(bounds.min().x..bounds.max().x),
            rng.random_range(bounds.min().y..bounds.max().y),
        )
    }

    /// Rejection loop shared by every pass.
    fn draw(
        &self,
        rng: &mut StdRng,
        accepted: &mut RTree<[f64; 2]>,
        n: usize,
        mut candidate: impl FnMut(&mut StdRng) -> Point<f64>,
        keep: impl Fn(&Point<f64>) -> bool,
    ) -> Vec<Point<f64>> {
        let min_sep2 = self.config.min_separation_m * self.config.min_separation_m;
        let max_attempts = n.saturating_mul(self.config.max_attempts_factor);

        let mut points = Vec::with_capacity(n);
        let mut attempts = 0;
        while points.len() < n && attempts < max_attempts {
            attempts += 1;
            let p = candidate(rng);
            let (x, y) = (p.x(), p.y());

            if !self.area.contains_metric(p) || !keep(&p) {
                continue;
            }
            if min_sep2 > 0.0
                && accepted
                    .locate_within_distance([x, y], min_sep2)
                    .next()
                    .is_some()
            {
                continue;
            }

            accepted.insert([x, y]);
            points.push(p);
        }

        if points.len() < n {
            warn!(
                requested = n,
                accepted = points.len(),
                attempts,
                "sampling stopped at attempt limit"
            );
        }
        points
    }

    fn to_samples(&self, points: Vec<Point<f64>>) -> Vec<SamplePoint> {
        let projection = self.area.projection();
        points
            .into_iter()
            .map(|p| SamplePoint::network(projection.to_geographic(p)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LocalProjection, Mode, Strategy};
    use geo::{Polygon, polygon};

    fn proj() -> LocalProjection {
        LocalProjection::new(Point::new(8.54, 47.37))
    }

    fn square(cx: f64, cy: f64, half: f64) -> MultiPolygon<f64> {
        let metric: Polygon<f64> = polygon![
            (x: cx - half, y: cy - half),
            (x: cx + half, y: cy - half),
            (x: cx + half, y: cy + half),
            (x: cx - half, y: cy + half),
        ];
        proj().polygons_to_geographic(&MultiPolygon::new(vec![metric]))
    }

    fn area_with_lake() -> StudyArea {
        StudyArea::new(&square(0.0, 0.0, 2_000.0), &square(0.0, 0.0, 500.0), proj()).unwrap()
    }

    #[test]
    fn samples_avoid_mask_and_stay_inside() {
        let area = area_with_lake();
        let config = SamplingConfig::default().with_density(500.0, 0);
        let samples = NetworkSampler::new(&area, &config).sample_n(40);

        assert!(!samples.is_empty());
        for s in &samples {
            assert_eq!(s.strategy, Strategy::Network);
            let m = area.projection().to_metric(s.location);
            assert!(m.x().abs() < 2_000.0 && m.y().abs() < 2_000.0);
            assert!(!(m.x().abs() < 500.0 && m.y().abs() < 500.0), "sample in lake");
        }
    }

    #[test]
    fn samples_keep_minimum_separation() {
        let area = area_with_lake();
        let config = SamplingConfig::default();
        let samples = NetworkSampler::new(&area, &config).sample_n(60);

        let metric: Vec<Point<f64>> = samples
            .iter()
            .map(|s| area.projection().to_metric(s.location))
            .collect();
        for (i, a) in metric.iter().enumerate() {
            for b in &metric[i + 1..] {
                let d = (a.x() - b.x()).hypot(a.y() - b.y());
                assert!(d >= 99.999, "samples {d} m apart");
            }
        }
    }

    #[test]
    fn same_seed_same_samples() {
        let area = area_with_lake();
        let config = SamplingConfig::default();
        let a = NetworkSampler::new(&area, &config).sample_n(25);
        let b = NetworkSampler::new(&area, &config).sample_n(25);
        assert_eq!(a, b);

        let other = SamplingConfig::default().with_seed(7);
        let c = NetworkSampler::new(&area, &other).sample_n(25);
        assert_ne!(a, c);
    }

    #[test]
    fn stops_at_attempt_limit() {
        // 4 km square minus lake cannot hold 10 000 samples 100 m apart.
        let area = area_with_lake();
        let config = SamplingConfig::default();
        let samples = NetworkSampler::new(&area, &config).sample_n(10_000);
        assert!(samples.len() < 10_000);
        assert!(!samples.is_empty());
    }

    #[test]
    fn extra_points_favour_dense_junctions() {
        let area =
            StudyArea::new(&square(0.0, 0.0, 2_000.0), &MultiPolygon::new(vec![]), proj()).unwrap();
        let config = SamplingConfig::default().with_density(500.0, 10);

        // 36 junctions in the north-east cell, a lone one in the south-west
        let mut junctions: Vec<Point<f64>> = (0..36)
            .map(|i| Point::new(1_550.0 + (i % 6) as f64 * 80.0, 1_550.0 + (i / 6) as f64 * 80.0))
            .collect();
        junctions.push(Point::new(-1_800.0, -1_800.0));

        let in_dense_cell = |samples: &[SamplePoint]| {
            samples
                .iter()
                .map(|s| area.projection().to_metric(s.location))
                .filter(|m| m.x() >= 1_500.0 && m.y() >= 1_500.0)
                .count()
        };

        let uniform = NetworkSampler::new(&area, &config).sample();
        let adaptive = NetworkSampler::new(&area, &config)
            .with_junctions(&junctions)
            .sample();

        assert!(in_dense_cell(&adaptive) >= 8, "{}", in_dense_cell(&adaptive));
        assert!(in_dense_cell(&uniform) < 5, "{}", in_dense_cell(&uniform));

        let again = NetworkSampler::new(&area, &config)
            .with_junctions(&junctions)
            .sample();
        assert_eq!(adaptive, again);
    }

    #[test]
    fn refinement_targets_uncovered_area() {
        let area = area_with_lake();
        let config = SamplingConfig::default().with_refinement(10, 0);
        let band = IsochroneBand {
            mode: Mode::Walk,
            strategy: Strategy::Network,
            lower_bound: 0.0,
            upper_bound: 5.0,
            polygon: square(-1_000.0, 0.0, 1_000.0),
        };

        let extra = NetworkSampler::new(&area, &config).refine(&[band], &[]);
        assert!(!extra.is_empty());
        for s in &extra {
            let m = area.projection().to_metric(s.location);
            assert!(m.x() >= -1.0, "refinement sample inside covered band");
        }
    }
}
