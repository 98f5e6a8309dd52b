//! Application state.

use std::sync::Arc;

use itemcast_core::ItemService;
use itemcast_hub::{Hub, PumpConfig};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ItemService>,
    pub hub: Hub,
    /// Settings applied to every WebSocket connection.
    pub pump: PumpConfig,
}

impl AppState {
    pub fn new(service: ItemService, pump: PumpConfig) -> Self {
        let hub = service.hub().clone();
        Self {
            service: Arc::new(service),
            hub,
            pump,
        }
    }
}
