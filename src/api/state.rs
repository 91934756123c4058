//! Application State
//!
//! Shared state accessible by all HTTP and WebSocket handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::config::ServerConfig;
use crate::selector::WeightTable;
use crate::store::SampleStore;
use crate::websocket::{ConnectionHub, HubConfig};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Open connections and their sessions
    pub hub: Arc<ConnectionHub>,
    /// Sample history sent to clients on connect
    pub store: Arc<dyn SampleStore>,
    /// Weights used by the chart selector
    pub weights: Arc<WeightTable>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Create state with a hub sized from the server configuration
    pub fn new(config: ServerConfig, weights: WeightTable, store: Arc<dyn SampleStore>) -> Self {
        let hub_config = HubConfig {
            max_connections: config.max_connections,
            client_buffer: config.client_buffer,
        };

        Self {
            hub: Arc::new(ConnectionHub::new(hub_config)),
            store,
            weights: Arc::new(weights),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get WebSocket connection count
    pub async fn ws_connection_count(&self) -> usize {
        self.hub.connection_count().await
    }
}
