//! Inverse-distance-weighted travel-time surface.

use geo::Point;
use rstar::RTree;
use rstar::primitives::GeomWithData;

type TimedPoint = GeomWithData<[f64; 2], f64>;

/// Travel time interpolated from scattered metric samples.
pub struct IdwSurface {
    tree: RTree<TimedPoint>,
    power: f64,
    neighbours: usize,
    max_distance_2: f64,
}

impl IdwSurface {
    /// Build from `(metric point, minutes)` pairs.
    ///
    /// Input order does not affect estimates: samples are sorted before the
    /// tree is loaded.
    pub fn new(
        samples: &[(Point<f64>, f64)],
        power: f64,
        neighbours: usize,
        max_distance_m: f64,
    ) -> Self {
        let mut points: Vec<TimedPoint> = samples
            .iter()
            .map(|(p, t)| GeomWithData::new([p.x(), p.y()], *t))
            .collect();
        points.sort_by(|a, b| {
            let (pa, pb) = (a.geom(), b.geom());
            pa[0]
                .total_cmp(&pb[0])
                .then(pa[1].total_cmp(&pb[1]))
                .then(a.data.total_cmp(&b.data))
        });

        Self {
            tree: RTree::bulk_load(points),
            power,
            neighbours: neighbours.max(1),
            max_distance_2: max_distance_m * max_distance_m,
        }
    }

    /// Estimated minutes at `p`, or `None` when no sample is within reach.
    pub fn estimate(&self, p: Point<f64>) -> Option<f64> {
        let query = [p.x(), p.y()];
        let mut near: Vec<(f64, &TimedPoint)> = self
            .tree
            .nearest_neighbor_iter_with_distance_2(&query)
            .take_while(|(_, d2)| *d2 <= self.max_distance_2)
            .take(self.neighbours)
            .map(|(item, d2)| (d2, item))
            .collect();
        if near.is_empty() {
            return None;
        }
        near.sort_by(|(da, a), (db, b)| {
            da.total_cmp(db)
                .then(a.geom()[0].total_cmp(&b.geom()[0]))
                .then(a.geom()[1].total_cmp(&b.geom()[1]))
        });

        if near[0].0 == 0.0 {
            return Some(near[0].1.data);
        }

        let mut weighted = 0.0;
        let mut total = 0.0;
        for (d2, item) in &near {
            let w = 1.0 / d2.sqrt().powf(self.power);
            weighted += w * item.data;
            total += w;
        }
        Some(weighted / total)
    }
}
