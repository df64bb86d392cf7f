//! R-tree index over points of interest.

use std::collections::HashMap;

use geo::Point;
use rstar::{AABB, PointDistance, RTree, RTreeObject};
use tracing::debug;

use crate::domain::{LocalProjection, Mode, Poi, PoiCategory, PoiId};

use super::error::SpatialError;

/// Maximum search radius for rental stations (metres).
const DEFAULT_RENTAL_RADIUS_M: f64 = 5_000.0;

/// Maximum search radius for parking (metres).
const DEFAULT_PARKING_RADIUS_M: f64 = 15_000.0;

/// Maximum search radius for transit stops (metres).
const DEFAULT_STOP_RADIUS_M: f64 = 15_000.0;

/// Search limits for the POI index.
#[derive(Debug, Clone)]
pub struct SpatialConfig {
    /// Beyond this distance a rental station is not a candidate.
    pub rental_radius_m: f64,
    /// Beyond this distance a parking lot is not a candidate.
    pub parking_radius_m: f64,
    /// Beyond this distance a transit stop is not a candidate.
    pub stop_radius_m: f64,
}

impl SpatialConfig {
    /// Maximum search radius for a category.
    pub fn radius_for(&self, category: PoiCategory) -> f64 {
        match category {
            PoiCategory::Rental => self.rental_radius_m,
            PoiCategory::Parking => self.parking_radius_m,
            PoiCategory::Stop => self.stop_radius_m,
        }
    }

    /// Use one radius for every category.
    pub fn with_radius(mut self, radius_m: f64) -> Self {
        self.rental_radius_m = radius_m;
        self.parking_radius_m = radius_m;
        self.stop_radius_m = radius_m;
        self
    }
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            rental_radius_m: DEFAULT_RENTAL_RADIUS_M,
            parking_radius_m: DEFAULT_PARKING_RADIUS_M,
            stop_radius_m: DEFAULT_STOP_RADIUS_M,
        }
    }
}

/// Entry stored in the R-tree: a metric position and the slot of the POI.
#[derive(Debug, Clone, PartialEq)]
struct IndexedPoi {
    id: PoiId,
    position: [f64; 2],
    slot: usize,
}

impl RTreeObject for IndexedPoi {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for IndexedPoi {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Immutable spatial index over all POIs, one R-tree per (category, mode).
///
/// Built once at startup; reads need no synchronisation.
pub struct PoiIndex {
    projection: LocalProjection,
    config: SpatialConfig,
    pois: Vec<Poi>,
    trees: HashMap<(PoiCategory, Mode), RTree<IndexedPoi>>,
}

impl PoiIndex {
    /// Build the index, bulk-loading one tree per (category, mode).
    pub fn build(pois: Vec<Poi>, projection: LocalProjection, config: SpatialConfig) -> Self {
        let mut groups: HashMap<(PoiCategory, Mode), Vec<IndexedPoi>> = HashMap::new();

        for (slot, poi) in pois.iter().enumerate() {
            let m = projection.to_metric(poi.location);
            for mode in &poi.modes {
                groups
                    .entry((poi.category, *mode))
                    .or_default()
                    .push(IndexedPoi {
                        id: poi.id,
                        position: [m.x(), m.y()],
                        slot,
                    });
            }
        }

        let trees = groups
            .into_iter()
            .map(|(key, entries)| {
                debug!(category = %key.0, mode = %key.1, count = entries.len(), "indexed POIs");
                (key, RTree::bulk_load(entries))
            })
            .collect();

        Self {
            projection,
            config,
            pois,
            trees,
        }
    }

    /// The `k` nearest POIs of `category` serving `mode`, nearest first.
    ///
    /// Equal distances are ordered by lowest POI id. Only POIs within the
    /// configured search radius are candidates; if there are none, the
    /// mode is unusable at `point` and `NoCandidate` is returned.
    pub fn nearest(
        &self,
        point: Point<f64>,
        category: PoiCategory,
        mode: Mode,
        k: usize,
    ) -> Result<Vec<&Poi>, SpatialError> {
        let radius = self.config.radius_for(category);
        let no_candidate = || SpatialError::NoCandidate {
            category,
            mode,
            radius_m: radius,
        };

        if k == 0 {
            return Ok(Vec::new());
        }

        let tree = self.trees.get(&(category, mode)).ok_or_else(no_candidate)?;
        let m = self.projection.to_metric(point);
        let query = [m.x(), m.y()];
        let max_d2 = radius * radius;

        // Distances are compared at millimetre resolution. Keep pulling past
        // the k-th entry while distances tie, so the id tie-break sees every
        // equally near candidate.
        let mut found: Vec<(i64, &IndexedPoi)> = Vec::new();
        for (entry, d2) in tree.nearest_neighbor_iter_with_distance_2(&query) {
            if d2 > max_d2 {
                break;
            }
            let mm = (d2.sqrt() * 1000.0).round() as i64;
            if found.len() >= k && found.last().is_some_and(|(last, _)| mm > *last) {
                break;
            }
            found.push((mm, entry));
        }

        if found.is_empty() {
            return Err(no_candidate());
        }

        found.sort_by_key(|(mm, e)| (*mm, e.id));
        found.truncate(k);

        Ok(found.into_iter().map(|(_, e)| &self.pois[e.slot]).collect())
    }

    /// Look up a POI by id.
    pub fn get(&self, id: PoiId) -> Option<&Poi> {
        self.pois.iter().find(|p| p.id == id)
    }

    /// The projection the index measures distances in.
    pub fn projection(&self) -> &LocalProjection {
        &self.projection
    }

    /// Total number of POIs.
    pub fn len(&self) -> usize {
        self.pois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pois.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn origin() -> Point<f64> {
        Point::new(8.54, 47.37)
    }

    fn proj() -> LocalProjection {
        LocalProjection::new(origin())
    }

    /// A POI `dx`/`dy` metres from the origin.
    fn poi_at(id: u64, dx: f64, dy: f64, category: PoiCategory, modes: &[Mode]) -> Poi {
        let location = proj().to_geographic(Point::new(dx, dy));
        Poi::new(PoiId(id), location, category, modes.iter().copied())
    }

    #[test]
    fn nearest_orders_by_distance() {
        let index = PoiIndex::build(
            vec![
                poi_at(1, 900.0, 0.0, PoiCategory::Parking, &[Mode::Cycle]),
                poi_at(2, 100.0, 0.0, PoiCategory::Parking, &[Mode::Cycle]),
                poi_at(3, 0.0, 400.0, PoiCategory::Parking, &[Mode::Cycle]),
            ],
            proj(),
            SpatialConfig::default(),
        );

        let found = index
            .nearest(origin(), PoiCategory::Parking, Mode::Cycle, 3)
            .unwrap();
        let ids: Vec<u64> = found.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn filters_by_mode_and_category() {
        let index = PoiIndex::build(
            vec![
                poi_at(1, 10.0, 0.0, PoiCategory::Parking, &[Mode::SelfDriveCar]),
                poi_at(2, 50.0, 0.0, PoiCategory::Rental, &[Mode::BicycleRental]),
                poi_at(3, 80.0, 0.0, PoiCategory::Parking, &[Mode::Cycle]),
            ],
            proj(),
            SpatialConfig::default(),
        );

        let found = index
            .nearest(origin(), PoiCategory::Parking, Mode::Cycle, 1)
            .unwrap();
        assert_eq!(found[0].id, PoiId(3));
    }

    #[test]
    fn no_candidate_beyond_radius() {
        let index = PoiIndex::build(
            vec![poi_at(1, 6_000.0, 0.0, PoiCategory::Rental, &[Mode::CarSharing])],
            proj(),
            SpatialConfig::default(),
        );

        let err = index
            .nearest(origin(), PoiCategory::Rental, Mode::CarSharing, 1)
            .unwrap_err();
        assert!(matches!(err, SpatialError::NoCandidate { .. }));
    }

    #[test]
    fn no_candidate_for_unindexed_mode() {
        let index = PoiIndex::build(Vec::new(), proj(), SpatialConfig::default());
        assert!(index.is_empty());
        assert!(
            index
                .nearest(origin(), PoiCategory::Rental, Mode::EscooterRental, 1)
                .is_err()
        );
    }

    #[test]
    fn equal_distance_picks_lowest_id() {
        let index = PoiIndex::build(
            vec![
                poi_at(7, 200.0, 0.0, PoiCategory::Rental, &[Mode::BicycleRental]),
                poi_at(3, -200.0, 0.0, PoiCategory::Rental, &[Mode::BicycleRental]),
                poi_at(5, 0.0, 200.0, PoiCategory::Rental, &[Mode::BicycleRental]),
            ],
            proj(),
            SpatialConfig::default(),
        );

        for _ in 0..5 {
            let found = index
                .nearest(origin(), PoiCategory::Rental, Mode::BicycleRental, 1)
                .unwrap();
            assert_eq!(found[0].id, PoiId(3));
        }
    }

    #[test]
    fn k_zero_is_empty() {
        let index = PoiIndex::build(
            vec![poi_at(1, 10.0, 0.0, PoiCategory::Stop, &[Mode::Walk])],
            proj(),
            SpatialConfig::default(),
        );
        assert!(
            index
                .nearest(origin(), PoiCategory::Stop, Mode::Walk, 0)
                .unwrap()
                .is_empty()
        );
    }

    proptest! {
        #[test]
        fn ties_resolve_to_lowest_id(ids in proptest::collection::btree_set(1u64..1000, 2..8)) {
            // Place every POI on a circle of 300 m so all distances tie.
            let n = ids.len();
            let pois: Vec<Poi> = ids
                .iter()
                .enumerate()
                .map(|(i, id)| {
                    let angle = i as f64 / n as f64 * std::f64::consts::TAU;
                    poi_at(*id, 300.0 * angle.cos(), 300.0 * angle.sin(), PoiCategory::Parking, &[Mode::Cycle])
                })
                .collect();
            let index = PoiIndex::build(pois, proj(), SpatialConfig::default());

            let found = index.nearest(origin(), PoiCategory::Parking, Mode::Cycle, 1).unwrap();
            prop_assert_eq!(found[0].id.0, *ids.iter().next().unwrap());
        }
    }
}
