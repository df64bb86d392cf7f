//! Application state for the web layer.

use std::sync::Arc;

use crate::compute::Engine;
use crate::persistence::Store;
use crate::routing::Backend;

/// The engine as configured at startup.
pub type AppEngine = Engine<Backend, Store>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AppEngine>,
}

impl AppState {
    pub fn new(engine: AppEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}
