//! Coordinate handling.
//!
//! External data and the routing API speak WGS84 longitude/latitude.
//! Distances, sampling and contouring happen in a local metric frame
//! centred on the study area, where one unit is one metre.

use geo::{Coord, MapCoords, MultiPolygon, Point};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Equirectangular projection around a reference point.
///
/// Accurate to well under a percent across a city or canton, which is the
/// scale the engine works at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    origin: Point<f64>,
    metres_per_deg_lon: f64,
    metres_per_deg_lat: f64,
}

impl LocalProjection {
    /// Create a projection centred on `origin` (WGS84).
    pub fn new(origin: Point<f64>) -> Self {
        let metres_per_deg_lat = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        let metres_per_deg_lon = metres_per_deg_lat * origin.y().to_radians().cos();
        Self {
            origin,
            metres_per_deg_lon,
            metres_per_deg_lat,
        }
    }

    /// Reference point of the projection.
    pub fn origin(&self) -> Point<f64> {
        self.origin
    }

    /// WGS84 → local metres.
    pub fn to_metric(&self, p: Point<f64>) -> Point<f64> {
        Point::new(
            (p.x() - self.origin.x()) * self.metres_per_deg_lon,
            (p.y() - self.origin.y()) * self.metres_per_deg_lat,
        )
    }

    /// Local metres → WGS84.
    pub fn to_geographic(&self, p: Point<f64>) -> Point<f64> {
        Point::new(
            self.origin.x() + p.x() / self.metres_per_deg_lon,
            self.origin.y() + p.y() / self.metres_per_deg_lat,
        )
    }

    /// Project a WGS84 multipolygon into the metric frame.
    pub fn polygons_to_metric(&self, mp: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        mp.map_coords(|c| self.to_metric(Point::from(c)).into())
    }

    /// Unproject a metric multipolygon back to WGS84.
    pub fn polygons_to_geographic(&self, mp: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        mp.map_coords(|c: Coord<f64>| self.to_geographic(Point::from(c)).into())
    }

    /// Ground distance in metres between two WGS84 points.
    pub fn distance_m(&self, a: Point<f64>, b: Point<f64>) -> f64 {
        metric_distance(self.to_metric(a), self.to_metric(b))
    }
}

/// Euclidean distance between two points in the metric frame.
pub fn metric_distance(a: Point<f64>, b: Point<f64>) -> f64 {
    (a.x() - b.x()).hypot(a.y() - b.y())
}

/// A WGS84 coordinate rounded to a fixed number of decimal places.
///
/// Used wherever coordinates take part in equality (cache keys), so
/// that floating-point noise never splits one location into two keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i64,
    pub y: i64,
}

impl GridCoord {
    /// Round `p` to `decimals` decimal places.
    pub fn round(p: Point<f64>, decimals: u32) -> Self {
        let scale = 10f64.powi(decimals as i32);
        Self {
            x: (p.x() * scale).round() as i64,
            y: (p.y() * scale).round() as i64,
        }
    }
}
