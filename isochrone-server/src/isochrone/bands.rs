//! Time band layout.

use crate::domain::TimeBand;

/// Consecutive bands of `width` minutes from 0 up to the first multiple of
/// `width` strictly above `max_mins`.
///
/// `max_mins` itself always falls inside the last band.
pub fn time_bands(max_mins: f64, width: f64) -> Vec<TimeBand> {
    if !max_mins.is_finite() || max_mins < 0.0 || width <= 0.0 {
        return Vec::new();
    }
    let count = (max_mins / width).floor() as usize + 1;
    (0..count)
        .map(|i| TimeBand::new(i as f64 * width, (i + 1) as f64 * width))
        .collect()
}

/// Index of the innermost band containing `mins`.
pub fn band_index(bands: &[TimeBand], mins: f64) -> Option<usize> {
    bands.iter().position(|b| mins < b.upper_mins && mins >= b.lower_mins)
}
