//! Band extraction from resolved samples.

use geo::{BooleanOps, MultiPolygon, Point};
use tracing::{debug, info};

use crate::domain::{IsochroneBand, Mode, SamplePoint, StationRef, Strategy, TripResult};
use crate::spatial::StudyArea;

use super::bands::time_bands;
use super::config::IsochroneConfig;
use super::error::IsochroneError;
use super::{network, radial};

/// Turns (sample, result) pairs into isochrone bands.
///
/// Bands come out ordered by upper bound, finest first. Bands whose
/// polygon ends up empty are dropped.
pub struct IsochroneExtractor<'a> {
    area: &'a StudyArea,
    config: &'a IsochroneConfig,
}

impl<'a> IsochroneExtractor<'a> {
    pub fn new(area: &'a StudyArea, config: &'a IsochroneConfig) -> Self {
        Self { area, config }
    }

    /// Bands over the whole study area from network samples.
    ///
    /// # Errors
    ///
    /// `InsufficientSamples` when fewer than `min_samples` results succeeded,
    /// `NoBands` when no band polygon survives clipping.
    pub fn network(
        &self,
        mode: Mode,
        results: &[(SamplePoint, TripResult)],
    ) -> Result<Vec<IsochroneBand>, IsochroneError> {
        let samples = self.successful(mode, Strategy::Network, results)?;
        let bands = time_bands(max_minutes(&samples), self.config.band_width_mins);
        let polygons = network::contour(self.area, &samples, &bands, self.config);
        self.finish(mode, Strategy::Network, &bands, polygons)
    }

    /// Bands around `station`, clipped to `max_radius_m` and the study area.
    ///
    /// # Errors
    ///
    /// `InsufficientSamples` when fewer than `min_samples` results succeeded,
    /// `NoBands` when no band polygon survives clipping.
    pub fn point(
        &self,
        mode: Mode,
        station: &StationRef,
        max_radius_m: f64,
        results: &[(SamplePoint, TripResult)],
    ) -> Result<Vec<IsochroneBand>, IsochroneError> {
        let samples = self.successful(mode, Strategy::Point, results)?;
        let bands = time_bands(max_minutes(&samples), self.config.band_width_mins);

        let centre = self.area.projection().to_metric(station.location);
        let clip = radial::circle(centre, max_radius_m).intersection(self.area.usable());
        let polygons = radial::contour(centre, &samples, &bands, self.config.sectors, &clip);
        self.finish(mode, Strategy::Point, &bands, polygons)
    }

    /// Successful samples as (metric point, minutes), in a canonical order.
    fn successful(
        &self,
        mode: Mode,
        strategy: Strategy,
        results: &[(SamplePoint, TripResult)],
    ) -> Result<Vec<(Point<f64>, f64)>, IsochroneError> {
        let projection = self.area.projection();
        let mut samples: Vec<(Point<f64>, f64)> = results
            .iter()
            .filter(|(_, r)| r.success && r.duration_secs.is_finite())
            .map(|(s, r)| (projection.to_metric(s.location), r.duration_mins()))
            .collect();

        if samples.len() < self.config.min_samples {
            return Err(IsochroneError::InsufficientSamples {
                mode,
                strategy,
                found: samples.len(),
                required: self.config.min_samples,
            });
        }

        samples.sort_by(|(a, ta), (b, tb)| {
            a.x()
                .total_cmp(&b.x())
                .then(a.y().total_cmp(&b.y()))
                .then(ta.total_cmp(tb))
        });
        debug!(%mode, %strategy, count = samples.len(), "contouring samples");
        Ok(samples)
    }

    fn finish(
        &self,
        mode: Mode,
        strategy: Strategy,
        bands: &[crate::domain::TimeBand],
        polygons: Vec<MultiPolygon<f64>>,
    ) -> Result<Vec<IsochroneBand>, IsochroneError> {
        let projection = self.area.projection();
        let out: Vec<IsochroneBand> = bands
            .iter()
            .zip(polygons)
            .filter(|(_, polygon)| !polygon.0.is_empty())
            .map(|(band, polygon)| IsochroneBand {
                mode,
                strategy,
                lower_bound: band.lower_mins,
                upper_bound: band.upper_mins,
                polygon: projection.polygons_to_geographic(&polygon),
            })
            .collect();
        if out.is_empty() {
            return Err(IsochroneError::NoBands { mode, strategy });
        }
        info!(%mode, %strategy, bands = out.len(), "isochrones extracted");
        Ok(out)
    }
}

fn max_minutes(samples: &[(Point<f64>, f64)]) -> f64 {
    samples.iter().map(|(_, t)| *t).fold(0.0, f64::max)
}
