//! Trip routing.
//!
//! This module resolves trip plans into travel times:
//! - walking legs are priced locally (walk graph or straight line)
//! - every other leg is routed by an external OJP trip API
//! - results are cached per trip, and rate limits are retried with backoff
//!
//! The OJP API speaks XML over HTTPS with bearer authentication. Requests
//! are throttled client-side by a concurrency semaphore and a per-minute
//! quota before they leave the process.

mod backoff;
mod client;
mod decode;
mod error;
mod mock;
mod orchestrator;
mod request;
mod walk;

use std::future::Future;

pub use backoff::RetryPolicy;
pub use client::{DEFAULT_BASE_URL, OjpClient, OjpConfig};
pub use decode::{TripResponse, decode_trip_response, parse_iso_duration};
pub use error::RoutingError;
pub use mock::MockRouter;
pub use orchestrator::{RoutingContext, RoutingOrchestrator};
pub use request::{TimeConstraint, TripQuery};
pub use walk::{WalkConfig, WalkEdge, WalkGraph, WalkGraphData, WalkNode, WalkPricer};

/// Something that can route a single trip.
///
/// This abstraction allows the orchestrator to be tested without network
/// access.
pub trait RoutingBackend: Send + Sync {
    /// Route one trip and return its fastest option.
    fn trip(
        &self,
        query: &TripQuery,
    ) -> impl Future<Output = Result<TripResponse, RoutingError>> + Send;
}

/// The backend chosen at startup.
#[derive(Debug, Clone)]
pub enum Backend {
    Ojp(OjpClient),
    Mock(MockRouter),
}

impl RoutingBackend for Backend {
    async fn trip(&self, query: &TripQuery) -> Result<TripResponse, RoutingError> {
        match self {
            Backend::Ojp(client) => client.trip(query).await,
            Backend::Mock(mock) => mock.trip(query).await,
        }
    }
}
