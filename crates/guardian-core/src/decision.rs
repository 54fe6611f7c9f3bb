//! Verdict decision.
//!
//! Reduces pooled rule and model signals to a single [`Verdict`]:
//!
//! 1. Each thresholded signal implies `block` (score >= block) or
//!    `soft_block` (score >= soft). The action is the most severe of these.
//! 2. `uncertainty = 1 - max(score)` over every signal, thresholded or not.
//!    When no signal reached [`MIN_CONFIDENCE`] the action becomes
//!    `escalate`, unless something already blocked.
//! 3. Severity follows the action; categories are collapsed per name.
//!
//! With no signals at all the uncertainty is 1 and the request escalates.

use tracing::debug;

use crate::classifier::ClassifierOutcome;
use crate::model::{Action, Explain, Verdict};
use crate::signal::{aggregate, CategoryScore};
use crate::thresholds::Thresholds;

/// Uncertainty above which a non-blocking verdict escalates.
pub const UNCERTAINTY_LIMIT: f64 = 0.15;

/// Lowest max score that counts as a confident assessment, `1 - UNCERTAINTY_LIMIT`.
///
/// `uncertainty > UNCERTAINTY_LIMIT` is evaluated as
/// `max_score < MIN_CONFIDENCE`; in binary floating point `1.0 - 0.85`
/// lands just above 0.15.
pub const MIN_CONFIDENCE: f64 = 0.85;

/// Reported uncertainty is rounded to this many decimal places.
const UNCERTAINTY_PRECISION: f64 = 1e9;

/// `1 - max_score`, rounded so that scores like 0.85 report 0.15 exactly.
fn uncertainty_of(max_score: f64) -> f64 {
    ((1.0 - max_score) * UNCERTAINTY_PRECISION).round() / UNCERTAINTY_PRECISION
}

/// Action implied by one signal under the given thresholds.
fn signal_action(signal: &CategoryScore, thresholds: &Thresholds) -> Action {
    match thresholds.get(&signal.name) {
        Some(t) if signal.score >= t.block => Action::Block,
        Some(t) if signal.score >= t.soft => Action::SoftBlock,
        _ => Action::Allow,
    }
}

/// Decides the verdict for a request.
///
/// `signals` holds rule and model signals pooled together, in any order.
/// `model` supplies the classifier's explanation and health; its signals are
/// expected to already be part of `signals`. Total: every input produces a
/// verdict.
pub fn decide(
    signals: &[CategoryScore],
    thresholds: &Thresholds,
    model: &ClassifierOutcome,
    fired_rules: &[String],
    policy_version: &str,
) -> Verdict {
    let mut action = Action::Allow;
    let mut max_score: f64 = 0.0;

    for signal in signals {
        action = action.raise(signal_action(signal, thresholds));
        max_score = max_score.max(signal.score);
    }

    let uncertainty = uncertainty_of(max_score);
    if max_score < MIN_CONFIDENCE && action != Action::Block {
        action = action.raise(Action::Escalate);
    }

    debug!(
        action = action.name(),
        max_score,
        uncertainty,
        signals = signals.len(),
        "Verdict decided"
    );

    Verdict {
        action,
        severity: action.severity(),
        categories: aggregate(signals),
        explain: Explain {
            rules_fired: fired_rules.to_vec(),
            model: model.explain(),
            classifier: model.status(),
            uncertainty,
            policy_version: policy_version.to_string(),
        },
    }
}
