//! Data transfer objects for web requests and responses.
//!
//! Compute requests and responses use the engine's own wire types
//! ([`RawComputeRequest`](crate::compute::RawComputeRequest) and
//! [`ComputeResponse`](crate::compute::ComputeResponse)).

use serde::{Deserialize, Serialize};

/// Request to cancel a running computation.
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub mode: String,

    #[serde(default)]
    pub network_isochrones: bool,

    /// Station of a point computation
    #[serde(default)]
    pub input_station: Option<String>,
}

/// Whether a running computation was found and cancelled.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_request_defaults() {
        let req: CancelRequest = serde_json::from_str(r#"{"mode": "walk"}"#).unwrap();
        assert_eq!(req.mode, "walk");
        assert!(!req.network_isochrones);
        assert!(req.input_station.is_none());
    }
}
