//! Multimodal travel-time sampling and isochrone synthesis.
//!
//! Estimates how long it takes to reach public transport, or to leave it,
//! by walking, cycling, driving, or with rental bikes, e-scooters and shared
//! cars, and turns the sampled travel times into isochrone bands.

pub mod cache;
pub mod compute;
pub mod datasets;
pub mod domain;
pub mod isochrone;
pub mod persistence;
pub mod planner;
pub mod routing;
pub mod sampling;
pub mod spatial;
pub mod stations;
pub mod web;
