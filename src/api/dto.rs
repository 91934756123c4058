//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.

use serde::{Deserialize, Serialize};

use crate::chart::ChartType;
use crate::selector::Ranking;

// ============================================
// RANK DTOs
// ============================================

/// Chart ranking request
#[derive(Debug, Deserialize)]
pub struct RankRequest {
    /// Candidate labels, duplicates allowed
    pub labels: Vec<ChartType>,
}

/// Chart ranking response
#[derive(Debug, Serialize)]
pub struct RankResponse {
    /// Chart type to render by default
    pub suggested: ChartType,
    /// Score of every chart type, in evaluation order
    pub scores: Vec<ScoreEntry>,
    /// Number of distinct candidate labels
    pub distinct_count: usize,
    /// Standard deviation of the candidates' ordinal positions
    pub dispersion: f64,
}

/// Score of one chart type
#[derive(Debug, Serialize)]
pub struct ScoreEntry {
    pub label: ChartType,
    pub score: f64,
}

impl From<Ranking> for RankResponse {
    fn from(ranking: Ranking) -> Self {
        Self {
            suggested: ranking.suggested,
            scores: ranking
                .scores
                .iter()
                .map(|(label, score)| ScoreEntry { label, score })
                .collect(),
            distinct_count: ranking.distinct_count,
            dispersion: ranking.dispersion,
        }
    }
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: healthy or degraded
    pub status: String,
    /// History store status: ok or unreachable
    pub store: String,
    /// Open WebSocket connections
    pub connections: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
