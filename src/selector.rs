//! Chart Selector
//!
//! Scores every chart type against a list of candidate labels and picks the
//! one to render by default.
//!
//! The score is a linear heuristic:
//!
//! - every chart type starts from `ease_of_interpretation + visual_appeal`
//!   taken from a [`WeightTable`]
//! - scatter alone additionally receives `distinct_count + dispersion`, where
//!   `dispersion` is the population standard deviation of the candidates'
//!   ordinal positions
//!
//! All five chart types are always scored, whether or not they appear in the
//! candidate list. The highest score wins and ties go to the first chart type
//! in [`EVALUATION_ORDER`].
//!
//! ```
//! use livechart::chart::ChartType;
//! use livechart::selector::{rank, WeightTable};
//!
//! let best = rank(ChartType::all(), &WeightTable::default()).unwrap();
//! assert_eq!(best, ChartType::Scatter);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::chart::ChartType;

/// Tie-break order: earlier entries win equal scores
pub const EVALUATION_ORDER: [ChartType; 5] = [
    ChartType::Scatter,
    ChartType::Horizontal,
    ChartType::Vertical,
    ChartType::Line,
    ChartType::Bar,
];

/// Errors raised by the selector
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SelectorError {
    /// No candidate labels were supplied
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A weight is negative or not a finite number
    #[error("Invalid weight {value} for {label} in {table}")]
    InvalidWeights {
        table: &'static str,
        label: ChartType,
        value: f64,
    },
}

/// One weight per chart type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelWeights {
    pub scatter: f64,
    pub line: f64,
    pub bar: f64,
    pub horizontal: f64,
    pub vertical: f64,
}

impl LabelWeights {
    /// Weight assigned to a chart type
    pub fn get(&self, chart: ChartType) -> f64 {
        match chart {
            ChartType::Scatter => self.scatter,
            ChartType::Line => self.line,
            ChartType::Bar => self.bar,
            ChartType::Horizontal => self.horizontal,
            ChartType::Vertical => self.vertical,
        }
    }

    fn validate(&self, table: &'static str) -> Result<(), SelectorError> {
        for &label in ChartType::all() {
            let value = self.get(label);
            if !value.is_finite() || value < 0.0 {
                return Err(SelectorError::InvalidWeights { table, label, value });
            }
        }
        Ok(())
    }
}

/// Hard-coded weights the selector is seeded with
///
/// When deserialized, any weight left out keeps its default, so a config
/// file can override a single label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PartialWeightTable")]
pub struct WeightTable {
    pub ease_of_interpretation: LabelWeights,
    pub visual_appeal: LabelWeights,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialWeights {
    scatter: Option<f64>,
    line: Option<f64>,
    bar: Option<f64>,
    horizontal: Option<f64>,
    vertical: Option<f64>,
}

impl PartialWeights {
    fn over(self, base: LabelWeights) -> LabelWeights {
        LabelWeights {
            scatter: self.scatter.unwrap_or(base.scatter),
            line: self.line.unwrap_or(base.line),
            bar: self.bar.unwrap_or(base.bar),
            horizontal: self.horizontal.unwrap_or(base.horizontal),
            vertical: self.vertical.unwrap_or(base.vertical),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialWeightTable {
    #[serde(default)]
    ease_of_interpretation: PartialWeights,
    #[serde(default)]
    visual_appeal: PartialWeights,
}

impl From<PartialWeightTable> for WeightTable {
    fn from(partial: PartialWeightTable) -> Self {
        Self {
            ease_of_interpretation: partial
                .ease_of_interpretation
                .over(default_ease_of_interpretation()),
            visual_appeal: partial.visual_appeal.over(default_visual_appeal()),
        }
    }
}

fn default_ease_of_interpretation() -> LabelWeights {
    LabelWeights {
        scatter: 5.0,
        line: 3.0,
        bar: 4.0,
        horizontal: 3.0,
        vertical: 4.0,
    }
}

fn default_visual_appeal() -> LabelWeights {
    LabelWeights {
        scatter: 4.0,
        line: 3.0,
        bar: 5.0,
        horizontal: 3.0,
        vertical: 4.0,
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            ease_of_interpretation: default_ease_of_interpretation(),
            visual_appeal: default_visual_appeal(),
        }
    }
}

impl WeightTable {
    /// Reject negative or non-finite weights so scores stay non-negative
    pub fn validate(&self) -> Result<(), SelectorError> {
        self.ease_of_interpretation
            .validate("ease_of_interpretation")?;
        self.visual_appeal.validate("visual_appeal")
    }

    /// Base score of a chart type before the scatter bonus
    pub fn base_score(&self, chart: ChartType) -> f64 {
        self.ease_of_interpretation.get(chart) + self.visual_appeal.get(chart)
    }
}

/// Scores for every chart type, in [`EVALUATION_ORDER`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBoard {
    entries: Vec<(ChartType, f64)>,
}

impl ScoreBoard {
    /// Score of a chart type
    pub fn get(&self, chart: ChartType) -> f64 {
        self.entries
            .iter()
            .find(|(label, _)| *label == chart)
            .map(|(_, score)| *score)
            .unwrap_or(0.0)
    }

    /// Iterate `(chart, score)` pairs in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = (ChartType, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Highest scoring chart type, first in evaluation order on ties
    pub fn best(&self) -> ChartType {
        let mut best = EVALUATION_ORDER[0];
        let mut best_score = f64::NEG_INFINITY;
        for (label, score) in self.iter() {
            if score > best_score {
                best = label;
                best_score = score;
            }
        }
        best
    }
}

/// Full outcome of one evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub suggested: ChartType,
    pub scores: ScoreBoard,
    pub distinct_count: usize,
    pub dispersion: f64,
}

/// Population standard deviation of the labels' ordinal positions
///
/// Duplicates count once per occurrence. Returns 0 for an empty slice.
pub fn dispersion(labels: &[ChartType]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }

    let n = labels.len() as f64;
    let mean = labels.iter().map(|l| l.ordinal() as f64).sum::<f64>() / n;
    let variance = labels
        .iter()
        .map(|l| (l.ordinal() as f64 - mean).powi(2))
        .sum::<f64>()
        / n;

    variance.sqrt()
}

/// Score every chart type against the candidate labels
pub fn score(labels: &[ChartType], weights: &WeightTable) -> Result<Ranking, SelectorError> {
    if labels.is_empty() {
        return Err(SelectorError::InvalidInput(
            "at least one chart type label is required".to_string(),
        ));
    }
    weights.validate()?;

    let distinct_count = labels.iter().collect::<HashSet<_>>().len();
    let dispersion = dispersion(labels);

    let entries = EVALUATION_ORDER
        .iter()
        .map(|&label| {
            let mut total = weights.base_score(label);
            if label == ChartType::Scatter {
                total += distinct_count as f64 + dispersion;
            }
            (label, total)
        })
        .collect();

    let scores = ScoreBoard { entries };

    Ok(Ranking {
        suggested: scores.best(),
        scores,
        distinct_count,
        dispersion,
    })
}

/// Pick the chart type to render by default
pub fn rank(labels: &[ChartType], weights: &WeightTable) -> Result<ChartType, SelectorError> {
    score(labels, weights).map(|ranking| ranking.suggested)
}
