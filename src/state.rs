//! Application State
//!
//! Everything a request handler needs. The dashboard (dataset, palettes,
//! layout, callbacks) is immutable after startup; the only moving part is
//! the clock broadcast channel.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::clock::{self, ClockEvent};
use crate::dashboard::Dashboard;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    pub clock_tx: broadcast::Sender<ClockEvent>,
    pub web_dir: String,
}

impl AppState {
    pub fn new(dashboard: Dashboard, web_dir: impl Into<String>) -> Self {
        let (clock_tx, _) = clock::channel();
        Self {
            dashboard: Arc::new(dashboard),
            clock_tx,
            web_dir: web_dir.into(),
        }
    }

    pub fn subscribe_clock(&self) -> broadcast::Receiver<ClockEvent> {
        self.clock_tx.subscribe()
    }

    pub fn app_name(&self) -> &str {
        &self.dashboard.config().app_name
    }
}
