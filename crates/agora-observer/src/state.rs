//! Shared application state for the control surface.

use std::sync::Arc;

use agora_core::{Scheduler, WorldStore};

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. The
/// scheduler owns the authoritative world; the store is only read for
/// the committed event log.
#[derive(Clone)]
pub struct AppState {
    /// The simulation being controlled.
    pub scheduler: Arc<Scheduler>,
    /// Where committed ticks live.
    pub world_store: Arc<dyn WorldStore>,
}

impl AppState {
    /// Serve `scheduler`, reading history from `world_store`.
    pub fn new(scheduler: Arc<Scheduler>, world_store: Arc<dyn WorldStore>) -> Self {
        Self {
            scheduler,
            world_store,
        }
    }
}
