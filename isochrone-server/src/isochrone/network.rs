//! Network contouring: interpolate onto a grid, assign cells to bands.
//!
//! Every grid cell gets at most one band, so bands never overlap. Cells
//! of one band are merged into rectangles (horizontal runs first, then
//! vertically stacked runs of equal extent) before the polygon union.

use std::collections::BTreeMap;

use geo::{BooleanOps, MultiPolygon, Point, Polygon, Rect, coord};
use tracing::debug;

use crate::domain::TimeBand;
use crate::spatial::StudyArea;

use super::bands::band_index;
use super::config::IsochroneConfig;
use super::idw::IdwSurface;

/// A horizontal run of cells `[start, end)` in one row.
type Run = (usize, usize, usize);

/// Metric band polygons for `samples` (metric point, minutes), one entry
/// per band in `bands`, clipped to the usable study area.
pub fn contour(
    area: &StudyArea,
    samples: &[(Point<f64>, f64)],
    bands: &[TimeBand],
    config: &IsochroneConfig,
) -> Vec<MultiPolygon<f64>> {
    let surface = IdwSurface::new(
        samples,
        config.idw_power,
        config.idw_neighbours,
        config.max_interpolation_m,
    );

    let cell = config.cell_size_m;
    let bounds = area.bounds();
    let x0 = (bounds.min().x / cell).floor() * cell;
    let y0 = (bounds.min().y / cell).floor() * cell;
    let cols = ((bounds.max().x - x0) / cell).ceil().max(0.0) as usize;
    let rows = ((bounds.max().y - y0) / cell).ceil().max(0.0) as usize;

    let mut rects: Vec<Vec<Rect<f64>>> = vec![Vec::new(); bands.len()];
    let mut open: BTreeMap<Run, usize> = BTreeMap::new();
    let emit = |rects: &mut Vec<Vec<Rect<f64>>>, (band, start, end): Run, row0: usize, row1: usize| {
        rects[band].push(Rect::new(
            coord! { x: x0 + start as f64 * cell, y: y0 + row0 as f64 * cell },
            coord! { x: x0 + end as f64 * cell, y: y0 + row1 as f64 * cell },
        ));
    };

    for row in 0..rows {
        let y = y0 + (row as f64 + 0.5) * cell;
        let assigned: Vec<Option<usize>> = (0..cols)
            .map(|col| {
                let centre = Point::new(x0 + (col as f64 + 0.5) * cell, y);
                if !area.in_boundary_metric(centre) {
                    return None;
                }
                surface
                    .estimate(centre)
                    .and_then(|mins| band_index(bands, mins))
            })
            .collect();

        let mut next: BTreeMap<Run, usize> = BTreeMap::new();
        for run in runs(&assigned) {
            let start_row = open.remove(&run).unwrap_or(row);
            next.insert(run, start_row);
        }
        for (run, start_row) in std::mem::replace(&mut open, next) {
            emit(&mut rects, run, start_row, row);
        }
    }
    for (run, start_row) in open {
        emit(&mut rects, run, start_row, rows);
    }

    rects
        .into_iter()
        .enumerate()
        .map(|(i, band_rects)| {
            debug!(band = i, rectangles = band_rects.len(), "merging band cells");
            let polygons: Vec<Polygon<f64>> = band_rects.into_iter().map(Rect::to_polygon).collect();
            union_all(polygons).intersection(area.usable())
        })
        .collect()
}

/// Maximal runs of equal, assigned cells in one row.
fn runs(assigned: &[Option<usize>]) -> Vec<Run> {
    let mut out = Vec::new();
    let mut col = 0;
    while col < assigned.len() {
        let Some(band) = assigned[col] else {
            col += 1;
            continue;
        };
        let start = col;
        while col < assigned.len() && assigned[col] == Some(band) {
            col += 1;
        }
        out.push((band, start, col));
    }
    out
}

/// Pairwise union, keeping operand sizes balanced.
pub(super) fn union_all(polygons: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    let mut layer: Vec<MultiPolygon<f64>> = polygons
        .into_iter()
        .map(|p| MultiPolygon::new(vec![p]))
        .collect();
    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| match pair {
                [a, b] => a.union(b),
                [a] => a.clone(),
                _ => MultiPolygon::new(Vec::new()),
            })
            .collect();
    }
    layer.pop().unwrap_or_else(|| MultiPolygon::new(Vec::new()))
}
