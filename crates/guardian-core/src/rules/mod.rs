//! Rule evaluation.
//!
//! The decider depends only on [`RuleEvaluator`], so the rule language can
//! be replaced without touching the decision logic.

mod keyword;

pub use keyword::{KeywordRuleEvaluator, RuleDefinition, DEFAULT_RULE_SET};

use crate::signal::CategoryScore;

/// Output of a rule evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleEvaluation {
    /// Rule-sourced signals, one per fired rule.
    pub signals: Vec<CategoryScore>,
    /// Identifiers of the rules that fired, in evaluation order.
    pub fired: Vec<String>,
}

impl RuleEvaluation {
    /// An evaluation where nothing fired.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if at least one rule fired.
    pub fn has_matches(&self) -> bool {
        !self.fired.is_empty()
    }
}

/// Evaluates policy rules against normalized text.
///
/// Implementations must be pure over their inputs and total: no match is an
/// empty evaluation, never an error.
pub trait RuleEvaluator: Send + Sync {
    /// Evaluates the rules in force for `tenant` under `policy_version`.
    fn evaluate(
        &self,
        text: &str,
        language: &str,
        tenant: &str,
        policy_version: &str,
    ) -> RuleEvaluation;

    /// Returns the name of this evaluator for logging.
    fn name(&self) -> &'static str;
}
