//! Chart Types
//!
//! The fixed set of chart rendering modes a dashboard can switch between.

use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// A supported chart rendering mode
///
/// Declaration order is significant: it defines each label's ordinal
/// position and the order labels are announced to clients.
///
/// Serialized as the lowercase name. Parsing, from text or from serde,
/// ignores case and surrounding whitespace.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Scatter,
    Line,
    Bar,
    Horizontal,
    Vertical,
}

impl ChartType {
    /// Get all chart types in declaration order
    pub fn all() -> &'static [ChartType] {
        &[
            ChartType::Scatter,
            ChartType::Line,
            ChartType::Bar,
            ChartType::Horizontal,
            ChartType::Vertical,
        ]
    }

    /// Zero-based position in declaration order
    pub fn ordinal(self) -> usize {
        match self {
            ChartType::Scatter => 0,
            ChartType::Line => 1,
            ChartType::Bar => 2,
            ChartType::Horizontal => 3,
            ChartType::Vertical => 4,
        }
    }

    /// Wire name of this chart type
    pub fn as_str(self) -> &'static str {
        match self {
            ChartType::Scatter => "scatter",
            ChartType::Line => "line",
            ChartType::Bar => "bar",
            ChartType::Horizontal => "horizontal",
            ChartType::Vertical => "vertical",
        }
    }
}

impl std::fmt::Display for ChartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Returned when a string names no known chart type
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown chart type: {0}")]
pub struct UnknownChartType(pub String);

impl FromStr for ChartType {
    type Err = UnknownChartType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartType::all()
            .iter()
            .copied()
            .find(|chart| chart.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownChartType(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for ChartType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
