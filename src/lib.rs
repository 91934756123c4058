//! # Livechart
//!
//! Live Chart Relay - pushes randomly generated samples to browser
//! dashboards over WebSocket and suggests which chart type to render.
//!
//! ## Modules
//!
//! - [`chart`]: The fixed set of chart types
//! - [`selector`]: Heuristic chart type ranking
//! - [`feed`]: Periodic sample generation and broadcast
//! - [`websocket`]: Push channel, connection hub and sessions
//! - [`store`]: Read-only sample history
//! - [`api`]: HTTP server with Axum
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use livechart::{store, AppState, Config, SampleFeed};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env();
//!     let state = AppState::new(
//!         config.server.clone(),
//!         config.selector.clone(),
//!         store::from_config(&config.store),
//!     );
//!
//!     let feed = Arc::new(SampleFeed::new(Arc::clone(&state.hub), config.feed.clone()));
//!     let feed_handle = feed.start();
//!
//!     livechart::serve(state).await?;
//!     feed_handle.abort();
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod chart;
pub mod config;
pub mod feed;
pub mod selector;
pub mod store;
pub mod websocket;

// Re-export top-level types for convenience
pub use api::{build_router, serve, ApiError, AppState};

pub use chart::{ChartType, UnknownChartType};

pub use config::{
    Config, ConfigError, FeedConfig, LoggingConfig, ServerConfig, StoreConfig,
};

pub use feed::{classify, Sample, SampleFeed};

pub use selector::{rank, score, LabelWeights, Ranking, ScoreBoard, SelectorError, WeightTable};

pub use store::{HistoryRecord, NullStore, SampleStore, SqliteStore, StoreError};

pub use websocket::{
    ClientMessage, ConnectionHub, HubConfig, HubError, ServerMessage, Session, websocket_handler,
};
