//! Web layer for the isochrone engine.
//!
//! A thin HTTP front: `POST /compute` runs a computation and returns its
//! record, `POST /compute/cancel` cancels a running one, `GET /health`
//! answers `ok`.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::{AppEngine, AppState};
