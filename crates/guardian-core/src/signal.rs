//! Category signals produced by rules and the classifier.

use serde::{Deserialize, Serialize};

/// Where a signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// A keyword or policy rule fired.
    Rule,
    /// The external classifier scored the text.
    Model,
}

impl SignalSource {
    /// Returns the wire name of this source.
    pub fn name(&self) -> &'static str {
        match self {
            SignalSource::Rule => "rule",
            SignalSource::Model => "model",
        }
    }
}

/// A single (category, score, source) observation about a piece of text.
///
/// Several signals may share a category name. They are kept apart until the
/// verdict is assembled, where only the strongest one per name survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// Category name, e.g. `violence_threat`.
    pub name: String,
    /// Score in `[0, 1]`.
    pub score: f64,
    /// Origin of the signal.
    pub source: SignalSource,
}

impl CategoryScore {
    /// Creates a new signal, clamping the score into `[0, 1]`.
    pub fn new(name: impl Into<String>, score: f64, source: SignalSource) -> Self {
        Self {
            name: name.into(),
            score: score.clamp(0.0, 1.0),
            source,
        }
    }

    /// Creates a rule-sourced signal.
    pub fn rule(name: impl Into<String>, score: f64) -> Self {
        Self::new(name, score, SignalSource::Rule)
    }

    /// Creates a model-sourced signal.
    pub fn model(name: impl Into<String>, score: f64) -> Self {
        Self::new(name, score, SignalSource::Model)
    }
}

/// Collapses signals to one entry per category name.
///
/// Output order is the order in which each name was first seen. For every
/// name the highest score wins; on a tie the earlier signal is kept.
pub fn aggregate(signals: &[CategoryScore]) -> Vec<CategoryScore> {
    let mut out: Vec<CategoryScore> = Vec::new();

    for signal in signals {
        match out.iter_mut().find(|s| s.name == signal.name) {
            Some(existing) => {
                if signal.score > existing.score {
                    *existing = signal.clone();
                }
            }
            None => out.push(signal.clone()),
        }
    }

    out
}
