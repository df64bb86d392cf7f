//! Isochrone extraction errors.

use crate::domain::{Mode, Strategy};

/// Error from band extraction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IsochroneError {
    /// Too few successful samples to contour
    #[error("insufficient samples for {mode} ({strategy}): {found} successful, {required} required")]
    InsufficientSamples {
        mode: Mode,
        strategy: Strategy,
        found: usize,
        required: usize,
    },

    /// Every band polygon came out empty after clipping
    #[error("no isochrones generated for {mode} ({strategy})")]
    NoBands { mode: Mode, strategy: Strategy },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = IsochroneError::InsufficientSamples {
            mode: Mode::EscooterRental,
            strategy: Strategy::Network,
            found: 0,
            required: 4,
        };
        assert_eq!(
            err.to_string(),
            "insufficient samples for escooter_rental (network): 0 successful, 4 required"
        );
    }
}
