//! Domain error types.
//!
//! These errors represent construction failures of domain values. They
//! are distinct from routing, storage and I/O errors.

/// Domain-level errors for validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// Coordinate is NaN or infinite
    #[error("invalid coordinate ({0}, {1})")]
    InvalidCoordinate(f64, f64),

    /// Trip plan has no legs
    #[error("trip plan must have at least one leg")]
    EmptyPlan,

    /// Consecutive legs do not share an endpoint
    #[error("consecutive legs are not connected")]
    DisconnectedLegs,
}
