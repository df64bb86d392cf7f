//! Radial contouring around a station.
//!
//! Samples are grouped into angular sectors. Along each sector the travel
//! time profile runs outward from the station (radius 0, time 0); the
//! boundary for a threshold sits where the profile first exceeds it,
//! interpolated linearly between the last sample inside and the first
//! beyond. Joining the per-sector radii gives a star-shaped polygon per
//! threshold, and a band is the ring between its two thresholds.

use std::f64::consts::TAU;

use geo::{BooleanOps, LineString, MultiPolygon, Point, Polygon};

use crate::domain::TimeBand;

/// Vertices of the clipping circle.
const CIRCLE_VERTICES: usize = 64;

/// Smallest boundary radius worth drawing (metres).
const MIN_RADIUS_M: f64 = 1.0;

/// `(radius, minutes)` pairs sorted outward, starting at the station.
type Profile = Vec<(f64, f64)>;

/// Metric band polygons around `centre`, one per band, clipped to `clip`.
pub fn contour(
    centre: Point<f64>,
    samples: &[(Point<f64>, f64)],
    bands: &[TimeBand],
    sectors: usize,
    clip: &MultiPolygon<f64>,
) -> Vec<MultiPolygon<f64>> {
    let sectors = sectors.max(3);
    let profiles = sector_profiles(centre, samples, sectors);

    let mut previous: Option<(f64, MultiPolygon<f64>)> = None;
    let mut last_radii = vec![0.0; sectors];
    let mut out = Vec::with_capacity(bands.len());

    for band in bands {
        let radii: Vec<f64> = profiles
            .iter()
            .zip(&last_radii)
            .map(|(profile, last)| boundary_radius(profile, band.upper_mins).max(*last))
            .collect();
        let outer = star_polygon(centre, &radii).intersection(clip);

        let ring = match &previous {
            Some((lower, inner)) if *lower > 0.0 => outer.difference(inner),
            _ => outer.clone(),
        };
        out.push(ring);
        previous = Some((band.upper_mins, outer));
        last_radii = radii;
    }
    out
}

/// Per-sector travel time profiles. Sectors without samples share the
/// profile of all samples.
fn sector_profiles(centre: Point<f64>, samples: &[(Point<f64>, f64)], sectors: usize) -> Vec<Profile> {
    let width = TAU / sectors as f64;
    let mut per_sector: Vec<Profile> = vec![Vec::new(); sectors];
    let mut all: Profile = Vec::new();

    for (p, mins) in samples {
        let dx = p.x() - centre.x();
        let dy = p.y() - centre.y();
        let r = dx.hypot(dy);
        if r < f64::EPSILON {
            continue;
        }
        let angle = dy.atan2(dx).rem_euclid(TAU);
        let idx = ((angle / width) as usize).min(sectors - 1);
        per_sector[idx].push((r, *mins));
        all.push((r, *mins));
    }

    let finish = |mut profile: Profile| {
        profile.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        profile.insert(0, (0.0, 0.0));
        profile
    };
    let all = finish(all);
    per_sector
        .into_iter()
        .map(|p| if p.is_empty() { all.clone() } else { finish(p) })
        .collect()
}

/// Radius at which `profile` first exceeds `threshold` minutes.
fn boundary_radius(profile: &[(f64, f64)], threshold: f64) -> f64 {
    for pair in profile.windows(2) {
        let (r0, t0) = pair[0];
        let (r1, t1) = pair[1];
        if t1 > threshold {
            if t0 >= threshold {
                return r0;
            }
            return r0 + (threshold - t0) / (t1 - t0) * (r1 - r0);
        }
    }
    profile.last().map_or(0.0, |(r, _)| *r)
}

/// Polygon through one vertex per sector, at the sector's mid angle.
fn star_polygon(centre: Point<f64>, radii: &[f64]) -> MultiPolygon<f64> {
    if radii.iter().all(|r| *r < MIN_RADIUS_M) {
        return MultiPolygon::new(Vec::new());
    }
    let width = TAU / radii.len() as f64;
    let ring: Vec<(f64, f64)> = radii
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let angle = (i as f64 + 0.5) * width;
            let r = r.max(MIN_RADIUS_M);
            (centre.x() + r * angle.cos(), centre.y() + r * angle.sin())
        })
        .collect();
    MultiPolygon::new(vec![Polygon::new(LineString::from(ring), Vec::new())])
}

/// Regular polygon approximating a circle.
pub fn circle(centre: Point<f64>, radius: f64) -> MultiPolygon<f64> {
    let ring: Vec<(f64, f64)> = (0..CIRCLE_VERTICES)
        .map(|i| {
            let angle = i as f64 / CIRCLE_VERTICES as f64 * TAU;
            (centre.x() + radius * angle.cos(), centre.y() + radius * angle.sin())
        })
        .collect();
    MultiPolygon::new(vec![Polygon::new(LineString::from(ring), Vec::new())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isochrone::bands::time_bands;
    use geo::{Area, Contains};

    fn ring_samples(times: impl Fn(f64) -> f64) -> Vec<(Point<f64>, f64)> {
        let mut out = Vec::new();
        for ring in 1..=4 {
            let r = ring as f64 * 500.0;
            for k in 0..16 {
                let a = (k as f64 + 0.5) / 16.0 * TAU;
                out.push((Point::new(r * a.cos(), r * a.sin()), times(r)));
            }
        }
        out
    }

    #[test]
    fn boundary_interpolates_between_samples() {
        let profile = vec![(0.0, 0.0), (500.0, 4.0), (1000.0, 8.0), (1500.0, 12.0)];
        assert!((boundary_radius(&profile, 6.0) - 750.0).abs() < 1e-9);
        assert!((boundary_radius(&profile, 4.0) - 500.0).abs() < 1e-9);
        assert_eq!(boundary_radius(&profile, 20.0), 1500.0);
        assert_eq!(boundary_radius(&profile, 0.0), 0.0);
    }

    #[test]
    fn rings_are_disjoint_and_nested() {
        // 1 minute per 125 m
        let samples = ring_samples(|r| r / 125.0);
        let bands = time_bands(16.0, 5.0);
        let clip = circle(Point::new(0.0, 0.0), 2_000.0);
        let polys = contour(Point::new(0.0, 0.0), &samples, &bands, 16, &clip);

        assert_eq!(polys.len(), 4);
        for (i, a) in polys.iter().enumerate() {
            for b in &polys[i + 1..] {
                assert!(a.intersection(b).unsigned_area() < 1.0);
            }
        }
        assert!(polys[0].contains(&Point::new(100.0, 100.0)));
        assert!(!polys[1].contains(&Point::new(100.0, 100.0)));
        assert!(polys[1].contains(&Point::new(800.0, 0.0)));

        let mut cumulative = 0.0;
        for p in &polys {
            let next = cumulative + p.unsigned_area();
            assert!(next >= cumulative);
            cumulative = next;
        }
    }

    #[test]
    fn clipped_to_circle() {
        let samples = ring_samples(|r| r / 500.0);
        let bands = time_bands(4.0, 5.0);
        let clip = circle(Point::new(0.0, 0.0), 1_000.0);
        let polys = contour(Point::new(0.0, 0.0), &samples, &bands, 16, &clip);

        let area: f64 = polys.iter().map(|p| p.unsigned_area()).sum();
        assert!(area <= clip.unsigned_area() + 1.0);
        assert!(area > 0.0);
    }

    #[test]
    fn empty_sectors_borrow_global_profile() {
        // samples only to the east
        let samples = vec![
            (Point::new(500.0, 10.0), 5.0),
            (Point::new(1000.0, 10.0), 10.0),
        ];
        let profiles = sector_profiles(Point::new(0.0, 0.0), &samples, 8);
        assert_eq!(profiles[0].len(), 3);
        assert_eq!(profiles[4], profiles[0]);
    }
}
