//! Boundary to the external content classifier.
//!
//! The classifier lives in another process. Every way it can fail is folded
//! into [`ClassifierOutcome::Failed`] so the pipeline can still decide from
//! rule signals alone, and so the verdict can record that it did.

mod http;

pub use http::{ClassifierConfig, ClassifierError, HttpClassifierGateway, DEFAULT_CLASSIFIER_TIMEOUT};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::signal::CategoryScore;

/// Health of the classifier call behind a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierStatus {
    /// The classifier answered with a well-formed response.
    Ok,
    /// The classifier was unreachable, timed out or answered garbage.
    Failed,
}

/// Result of asking the classifier about a text.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierOutcome {
    /// The classifier answered. `signals` may legitimately be empty.
    Healthy {
        /// Model-sourced signals.
        signals: Vec<CategoryScore>,
        /// Raw explanation payload from the classifier.
        explain: serde_json::Value,
    },
    /// No usable answer was obtained.
    Failed {
        /// Human-readable cause, for logs.
        reason: String,
    },
}

impl ClassifierOutcome {
    /// Creates a failed outcome.
    pub fn failed(reason: impl Into<String>) -> Self {
        ClassifierOutcome::Failed {
            reason: reason.into(),
        }
    }

    /// Returns the model signals (empty on failure).
    pub fn signals(&self) -> &[CategoryScore] {
        match self {
            ClassifierOutcome::Healthy { signals, .. } => signals,
            ClassifierOutcome::Failed { .. } => &[],
        }
    }

    /// Returns the explanation payload (an empty object on failure).
    pub fn explain(&self) -> serde_json::Value {
        match self {
            ClassifierOutcome::Healthy { explain, .. } => explain.clone(),
            ClassifierOutcome::Failed { .. } => serde_json::Value::Object(Default::default()),
        }
    }

    /// Returns the status recorded in the explain trail.
    pub fn status(&self) -> ClassifierStatus {
        match self {
            ClassifierOutcome::Healthy { .. } => ClassifierStatus::Ok,
            ClassifierOutcome::Failed { .. } => ClassifierStatus::Failed,
        }
    }

    /// Consumes the outcome, returning its signals.
    pub fn into_signals(self) -> Vec<CategoryScore> {
        match self {
            ClassifierOutcome::Healthy { signals, .. } => signals,
            ClassifierOutcome::Failed { .. } => Vec::new(),
        }
    }
}

/// Capability for scoring text with an external classifier.
///
/// Implementations must not panic or return errors; failures are reported
/// through [`ClassifierOutcome::Failed`].
#[async_trait]
pub trait ClassifierGateway: Send + Sync {
    /// Classifies normalized `text` written in `language`.
    async fn classify(&self, text: &str, language: &str) -> ClassifierOutcome;

    /// Returns the name of this gateway for logging.
    fn name(&self) -> &'static str;
}

/// Gateway used when no classifier is configured. Always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledClassifier;

#[async_trait]
impl ClassifierGateway for DisabledClassifier {
    async fn classify(&self, _text: &str, _language: &str) -> ClassifierOutcome {
        ClassifierOutcome::failed("classifier disabled")
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn healthy_accessors() {
        let outcome = ClassifierOutcome::Healthy {
            signals: vec![CategoryScore::model("toxicity", 0.4)],
            explain: json!({"model": "detoxify-multilingual"}),
        };
        assert_eq!(outcome.status(), ClassifierStatus::Ok);
        assert_eq!(outcome.signals().len(), 1);
        assert_eq!(outcome.explain()["model"], "detoxify-multilingual");
    }

    #[test]
    fn healthy_without_signals_is_not_failure() {
        let outcome = ClassifierOutcome::Healthy {
            signals: vec![],
            explain: json!({}),
        };
        assert_eq!(outcome.status(), ClassifierStatus::Ok);
        assert!(outcome.signals().is_empty());
    }

    #[test]
    fn failed_accessors() {
        let outcome = ClassifierOutcome::failed("connection refused");
        assert_eq!(outcome.status(), ClassifierStatus::Failed);
        assert!(outcome.signals().is_empty());
        assert_eq!(outcome.explain(), json!({}));
        assert!(outcome.into_signals().is_empty());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(serde_json::to_value(ClassifierStatus::Ok).unwrap(), "ok");
        assert_eq!(serde_json::to_value(ClassifierStatus::Failed).unwrap(), "failed");
    }

    #[tokio::test]
    async fn disabled_classifier_fails() {
        let outcome = DisabledClassifier.classify("anything", "en").await;
        assert_eq!(outcome.status(), ClassifierStatus::Failed);
        assert_eq!(DisabledClassifier.name(), "disabled");
    }
}
