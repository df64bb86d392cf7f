//! Local pricing of walking legs.
//!
//! Walking legs never hit the routing API. With a walking network loaded
//! they are priced by shortest path over the graph; without one, by
//! straight-line distance scaled by a detour factor.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use geo::Point;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::domain::{LocalProjection, metric_distance};

/// Walking parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkConfig {
    pub speed_kmh: f64,

    /// Multiplier on straight-line distance when no graph path exists.
    pub detour_factor: f64,

    /// Legs shorter than this many metres cost `short_leg_secs`.
    pub short_leg_m: f64,
    pub short_leg_secs: f64,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            speed_kmh: 4.0,
            detour_factor: 1.3,
            short_leg_m: 30.0,
            short_leg_secs: 60.0,
        }
    }
}

impl WalkConfig {
    fn speed_mps(&self) -> f64 {
        self.speed_kmh / 3.6
    }
}

/// Walking network as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalkGraphData {
    pub nodes: Vec<WalkNode>,
    pub edges: Vec<WalkEdge>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkNode {
    pub id: u64,
    pub lon: f64,
    pub lat: f64,
}

/// Undirected edge; `length_m` defaults to the straight-line length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkEdge {
    pub from: u64,
    pub to: u64,
    #[serde(default)]
    pub length_m: Option<f64>,
}

struct SnapNode {
    position: [f64; 2],
    index: usize,
}

impl RTreeObject for SnapNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for SnapNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Walking network in the local metric frame.
pub struct WalkGraph {
    positions: Vec<Point<f64>>,
    adjacency: Vec<Vec<(usize, f64)>>,
    snap: RTree<SnapNode>,
}

#[derive(Copy, Clone, PartialEq)]
struct QueueEntry {
    cost: f64,
    node: usize,
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // min-heap on cost, ties on node index for determinism
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl WalkGraph {
    /// Build from stored data. Edges naming unknown nodes are skipped.
    pub fn build(data: &WalkGraphData, projection: &LocalProjection) -> Self {
        let mut ids = HashMap::with_capacity(data.nodes.len());
        let mut positions = Vec::with_capacity(data.nodes.len());
        for node in &data.nodes {
            ids.insert(node.id, positions.len());
            positions.push(projection.to_metric(Point::new(node.lon, node.lat)));
        }

        let mut adjacency = vec![Vec::new(); positions.len()];
        for edge in &data.edges {
            let (Some(&a), Some(&b)) = (ids.get(&edge.from), ids.get(&edge.to)) else {
                continue;
            };
            let length = edge
                .length_m
                .unwrap_or_else(|| metric_distance(positions[a], positions[b]));
            adjacency[a].push((b, length));
            adjacency[b].push((a, length));
        }

        let snap = RTree::bulk_load(
            positions
                .iter()
                .enumerate()
                .map(|(index, p)| SnapNode {
                    position: [p.x(), p.y()],
                    index,
                })
                .collect(),
        );

        Self {
            positions,
            adjacency,
            snap,
        }
    }

    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    /// Metric positions of nodes joining three or more edges.
    pub fn junctions(&self) -> impl Iterator<Item = Point<f64>> + '_ {
        self.positions
            .iter()
            .zip(&self.adjacency)
            .filter(|(_, edges)| edges.len() >= 3)
            .map(|(p, _)| *p)
    }

    /// Walking distance in metres between two metric points: snap to the
    /// nearest nodes, shortest path between them, plus the snapping
    /// distances. `None` when the nodes are not connected.
    pub fn distance_m(&self, from: Point<f64>, to: Point<f64>) -> Option<f64> {
        let a = self.snap.nearest_neighbor(&[from.x(), from.y()])?;
        let b = self.snap.nearest_neighbor(&[to.x(), to.y()])?;
        let path = self.shortest_path(a.index, b.index)?;
        Some(
            metric_distance(from, self.positions[a.index])
                + path
                + metric_distance(to, self.positions[b.index]),
        )
    }

    fn shortest_path(&self, source: usize, target: usize) -> Option<f64> {
        let mut dist = vec![f64::INFINITY; self.positions.len()];
        let mut heap = BinaryHeap::new();
        dist[source] = 0.0;
        heap.push(QueueEntry {
            cost: 0.0,
            node: source,
        });

        while let Some(QueueEntry { cost, node }) = heap.pop() {
            if node == target {
                return Some(cost);
            }
            if cost > dist[node] {
                continue;
            }
            for &(next, length) in &self.adjacency[node] {
                let candidate = cost + length;
                if candidate < dist[next] {
                    dist[next] = candidate;
                    heap.push(QueueEntry {
                        cost: candidate,
                        node: next,
                    });
                }
            }
        }
        None
    }
}

/// Prices walking legs.
pub struct WalkPricer {
    graph: Option<WalkGraph>,
    projection: LocalProjection,
    config: WalkConfig,
}

impl WalkPricer {
    pub fn new(graph: Option<WalkGraph>, projection: LocalProjection, config: WalkConfig) -> Self {
        Self {
            graph,
            projection,
            config,
        }
    }

    /// Straight-line pricing only.
    pub fn straight_line(projection: LocalProjection) -> Self {
        Self::new(None, projection, WalkConfig::default())
    }

    pub fn has_graph(&self) -> bool {
        self.graph.is_some()
    }

    /// Fixed cost of a leg too short to route: 0 for identical endpoints,
    /// `short_leg_secs` under `short_leg_m`. `None` otherwise.
    pub fn short_leg_secs(&self, from: Point<f64>, to: Point<f64>) -> Option<f64> {
        if from == to {
            return Some(0.0);
        }
        (self.projection.distance_m(from, to) < self.config.short_leg_m)
            .then_some(self.config.short_leg_secs)
    }

    /// Metres walked between two WGS84 points: along the graph when there
    /// is a path, otherwise straight line times the detour factor.
    pub fn distance_m(&self, from: Point<f64>, to: Point<f64>) -> f64 {
        let a = self.projection.to_metric(from);
        let b = self.projection.to_metric(to);
        self.graph
            .as_ref()
            .and_then(|g| g.distance_m(a, b))
            .unwrap_or_else(|| metric_distance(a, b) * self.config.detour_factor)
    }

    /// Seconds to walk between two WGS84 points.
    pub fn duration_secs(&self, from: Point<f64>, to: Point<f64>) -> f64 {
        if let Some(secs) = self.short_leg_secs(from, to) {
            return secs;
        }
        self.distance_m(from, to) / self.config.speed_mps()
    }

    /// Street junctions (nodes of degree three or more) in the local
    /// metric frame. Empty without a graph.
    pub fn junctions(&self) -> Vec<Point<f64>> {
        self.graph
            .as_ref()
            .map(|g| g.junctions().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proj() -> LocalProjection {
        LocalProjection::new(Point::new(8.54, 47.37))
    }

    fn at(dx: f64, dy: f64) -> Point<f64> {
        proj().to_geographic(Point::new(dx, dy))
    }

    fn node(id: u64, dx: f64, dy: f64) -> WalkNode {
        let p = at(dx, dy);
        WalkNode {
            id,
            lon: p.x(),
            lat: p.y(),
        }
    }

    fn edge(from: u64, to: u64) -> WalkEdge {
        WalkEdge {
            from,
            to,
            length_m: None,
        }
    }

    /// An L-shaped path 0 -> 1 -> 2 plus an isolated node 3.
    fn graph() -> WalkGraph {
        let data = WalkGraphData {
            nodes: vec![
                node(0, 0.0, 0.0),
                node(1, 1000.0, 0.0),
                node(2, 1000.0, 1000.0),
                node(3, 5000.0, 5000.0),
            ],
            edges: vec![edge(0, 1), edge(1, 2), edge(2, 99)],
        };
        WalkGraph::build(&data, &proj())
    }

    #[test]
    fn shortest_path_follows_edges() {
        let g = graph();
        assert_eq!(g.node_count(), 4);
        let d = g
            .distance_m(Point::new(0.0, 0.0), Point::new(1000.0, 1000.0))
            .unwrap();
        assert!((d - 2000.0).abs() < 1e-6);
    }

    #[test]
    fn disconnected_nodes_have_no_path() {
        let g = graph();
        assert!(
            g.distance_m(Point::new(0.0, 0.0), Point::new(5000.0, 5000.0))
                .is_none()
        );
    }

    #[test]
    fn pricer_uses_graph_then_fallback() {
        let pricer = WalkPricer::new(Some(graph()), proj(), WalkConfig::default());
        // 2 km along the graph at 4 km/h = 30 min
        let secs = pricer.duration_secs(at(0.0, 0.0), at(1000.0, 1000.0));
        assert!((secs - 1800.0).abs() < 1.0);

        // disconnected: straight line x 1.3
        let secs = pricer.duration_secs(at(0.0, 0.0), at(5000.0, 5000.0));
        let expected = 5000.0 * std::f64::consts::SQRT_2 * 1.3 / (4.0 / 3.6);
        assert!((secs - expected).abs() < 1.0);
    }

    #[test]
    fn junctions_have_three_edges() {
        let data = WalkGraphData {
            nodes: vec![
                node(0, 0.0, 0.0),
                node(1, 100.0, 0.0),
                node(2, -100.0, 0.0),
                node(3, 0.0, 100.0),
                node(4, 200.0, 0.0),
            ],
            edges: vec![edge(0, 1), edge(0, 2), edge(0, 3), edge(1, 4)],
        };
        let pricer = WalkPricer::new(
            Some(WalkGraph::build(&data, &proj())),
            proj(),
            WalkConfig::default(),
        );

        let junctions = pricer.junctions();
        assert_eq!(junctions.len(), 1);
        assert!(junctions[0].x().abs() < 1e-6 && junctions[0].y().abs() < 1e-6);
        assert!(WalkPricer::straight_line(proj()).junctions().is_empty());
    }

    #[test]
    fn short_and_identical_legs() {
        let pricer = WalkPricer::straight_line(proj());
        assert_eq!(pricer.duration_secs(at(10.0, 10.0), at(10.0, 10.0)), 0.0);
        assert_eq!(pricer.duration_secs(at(0.0, 0.0), at(20.0, 0.0)), 60.0);
        assert!(!pricer.has_graph());

        let secs = pricer.duration_secs(at(0.0, 0.0), at(1000.0, 0.0));
        assert!((secs - 1300.0 / (4.0 / 3.6)).abs() < 0.5);
    }
}
