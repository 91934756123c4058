//! Sample Feed
//!
//! Generates one random sample per tick and broadcasts it, together with a
//! suggested chart type, to every connected client.
//!
//! Exactly one feed runs per server. Each broadcast is awaited before the
//! next sample is generated, so every client sees samples in generation
//! order.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::chart::ChartType;
use crate::config::FeedConfig;
use crate::websocket::{ConnectionHub, ServerMessage};

/// Default threshold used by [`classify`]
pub const DEFAULT_CUTOFF: u32 = 50;

/// Pick a chart type for a sample value
///
/// Values strictly above `cutoff` suggest `line`; everything else `bar`.
pub fn classify(value: u32, cutoff: u32) -> ChartType {
    if value > cutoff {
        ChartType::Line
    } else {
        ChartType::Bar
    }
}

/// One generated data point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Position in generation order, starting at 0
    pub sequence: u64,
    pub value: u32,
    pub label: ChartType,
}

impl Sample {
    /// Wire form of this sample
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::UpdateData {
            new_data: self.value,
            suggested_graph_type: self.label,
        }
    }
}

/// Periodic sample generator
pub struct SampleFeed {
    hub: Arc<ConnectionHub>,
    config: FeedConfig,
    sequence: AtomicU64,
}

impl SampleFeed {
    /// Create a feed broadcasting through `hub`
    pub fn new(hub: Arc<ConnectionHub>, config: FeedConfig) -> Self {
        Self {
            hub,
            config,
            sequence: AtomicU64::new(0),
        }
    }

    /// Feed configuration
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Number of samples generated so far
    pub fn generated(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    /// Draw the next sample
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Sample {
        let value = rng.gen_range(0..self.config.upper_bound.max(1));
        Sample {
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            value,
            label: classify(value, self.config.cutoff),
        }
    }

    /// Generate one sample and broadcast it
    ///
    /// Returns the sample and the number of clients it was queued for.
    pub async fn tick<R: Rng + ?Sized>(&self, rng: &mut R) -> (Sample, usize) {
        let sample = self.generate(rng);
        let delivered = self.hub.broadcast(&sample.to_message()).await;

        tracing::trace!(
            sequence = sample.sequence,
            value = sample.value,
            label = %sample.label,
            delivered,
            "Sample broadcast"
        );
        (sample, delivered)
    }

    /// Spawn the background task that ticks forever
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let interval = Duration::from_millis(self.config.interval_ms.max(1));

        tracing::info!(
            interval_ms = interval.as_millis() as u64,
            cutoff = self.config.cutoff,
            "Starting sample feed"
        );

        tokio::spawn(async move {
            let mut rng = StdRng::from_entropy();
            let mut ticker = tokio::time::interval(interval);

            // Skip the first immediate tick
            ticker.tick().await;

            loop {
                ticker.tick().await;
                self.tick(&mut rng).await;
            }
        })
    }
}
