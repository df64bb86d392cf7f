//! Computations: from a validated request to stored isochrones.
//!
//! A computation samples origins, plans and resolves one trip per sample
//! on a bounded worker pool, extracts isochrone bands and saves them.
//! Per-sample failures are absorbed; only whole-computation conditions
//! (cancellation, too few samples, rate limiting everywhere, invalid
//! input) end in a failed response.

mod cancel;
mod config;
mod engine;
mod error;
mod pool;
mod registry;
mod request;
mod response;
mod task;

pub use cancel::CancelToken;
pub use config::{DEFAULT_CONCURRENCY, EngineConfig};
pub use engine::Engine;
pub use error::ComputeError;
pub use pool::run_bounded;
pub use registry::{AlreadyInProgress, ComputationKey, InFlightGuard, InFlightRegistry};
pub use request::{ComputeRequest, RawComputeRequest, RequestError, Target};
pub use response::{ComputeResponse, Status};
pub use task::{TaskEvent, TaskLog, TaskState, TaskSummary};
