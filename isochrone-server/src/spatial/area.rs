//! The study area: where samples may be drawn and isochrones may extend.

use geo::{Area, BooleanOps, BoundingRect, Contains, MultiPolygon, Point, Rect};

use crate::domain::LocalProjection;

use super::error::SpatialError;

/// Study area boundary with an exclusion mask (water bodies), held in the
/// local metric frame.
#[derive(Debug, Clone)]
pub struct StudyArea {
    projection: LocalProjection,
    boundary: MultiPolygon<f64>,
    excluded: MultiPolygon<f64>,
    usable: MultiPolygon<f64>,
    bounds: Rect<f64>,
}

impl StudyArea {
    /// Build a study area from WGS84 geometries.
    ///
    /// `excluded` may be empty.
    pub fn new(
        boundary: &MultiPolygon<f64>,
        excluded: &MultiPolygon<f64>,
        projection: LocalProjection,
    ) -> Result<Self, SpatialError> {
        let boundary = projection.polygons_to_metric(boundary);
        let excluded = projection.polygons_to_metric(excluded);
        let bounds = boundary
            .bounding_rect()
            .ok_or(SpatialError::EmptyBoundary)?;
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return Err(SpatialError::EmptyBoundary);
        }

        let usable = if excluded.0.is_empty() {
            boundary.clone()
        } else {
            boundary.difference(&excluded)
        };

        Ok(Self {
            projection,
            boundary,
            excluded,
            usable,
            bounds,
        })
    }

    /// Whether a metric point lies inside the boundary and outside the mask.
    pub fn contains_metric(&self, p: Point<f64>) -> bool {
        self.boundary.contains(&p) && !self.excluded.contains(&p)
    }

    /// Whether a WGS84 point may be sampled.
    pub fn contains(&self, p: Point<f64>) -> bool {
        self.contains_metric(self.projection.to_metric(p))
    }

    /// Whether a metric point lies in the exclusion mask.
    pub fn is_excluded_metric(&self, p: Point<f64>) -> bool {
        self.excluded.contains(&p)
    }

    /// Whether a metric point lies inside the boundary, ignoring the mask.
    pub fn in_boundary_metric(&self, p: Point<f64>) -> bool {
        self.boundary.contains(&p)
    }

    /// Metric bounding rectangle of the boundary.
    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    /// Boundary minus exclusion mask, in metres.
    pub fn usable(&self) -> &MultiPolygon<f64> {
        &self.usable
    }

    /// Usable area in square metres.
    pub fn area_m2(&self) -> f64 {
        self.usable.unsigned_area()
    }

    pub fn projection(&self) -> &LocalProjection {
        &self.projection
    }
}
