//! Regex keyword rules.
//!
//! Each rule is a named set of patterns bound to a category and a fixed
//! score. Rules are grouped by policy version; a version without its own
//! group falls back to [`DEFAULT_RULE_SET`].

use std::collections::HashMap;

use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{RuleEvaluation, RuleEvaluator};
use crate::error::{PolicyError, PolicyResult};
use crate::signal::CategoryScore;

/// Policy version key of the fallback rule group.
pub const DEFAULT_RULE_SET: &str = "*";

/// Declarative form of a keyword rule, as found in policy files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Rule identifier reported in the explain trail.
    pub id: String,
    /// Category of the emitted signal.
    pub category: String,
    /// Score of the emitted signal.
    pub score: f64,
    /// Regex patterns; any match fires the rule.
    pub patterns: Vec<String>,
    /// Policy version the rule belongs to. `None` puts it in the fallback group.
    #[serde(default)]
    pub policy_version: Option<String>,
    /// Restricts the rule to one tenant.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Restricts the rule to these languages (primary subtag). Empty means all.
    #[serde(default)]
    pub languages: Vec<String>,
}

impl RuleDefinition {
    /// Creates a rule for the fallback group that applies everywhere.
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        score: f64,
        patterns: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            score,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            policy_version: None,
            tenant_id: None,
            languages: Vec::new(),
        }
    }

    /// Binds the rule to a policy version.
    pub fn for_policy(mut self, policy_version: impl Into<String>) -> Self {
        self.policy_version = Some(policy_version.into());
        self
    }

    /// Binds the rule to a tenant.
    pub fn for_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant.into());
        self
    }

    /// Restricts the rule to the given languages.
    pub fn for_languages(mut self, languages: &[&str]) -> Self {
        self.languages = languages.iter().map(|l| l.to_string()).collect();
        self
    }
}

/// A rule with its patterns compiled.
struct CompiledRule {
    id: String,
    category: String,
    score: f64,
    regex_set: RegexSet,
    tenant: Option<String>,
    languages: Vec<String>,
}

impl CompiledRule {
    fn compile(def: RuleDefinition) -> PolicyResult<Self> {
        if def.patterns.is_empty() {
            return Err(PolicyError::InvalidRule {
                rule_id: def.id,
                reason: "rule has no patterns".to_string(),
            });
        }
        if !def.score.is_finite() || !(0.0..=1.0).contains(&def.score) {
            return Err(PolicyError::InvalidRule {
                reason: format!("score {} is outside [0, 1]", def.score),
                rule_id: def.id,
            });
        }

        let regex_set = RegexSetBuilder::new(&def.patterns)
            .case_insensitive(true)
            .build()
            .map_err(|source| PolicyError::InvalidPattern {
                rule_id: def.id.clone(),
                source,
            })?;

        Ok(Self {
            id: def.id,
            category: def.category,
            score: def.score,
            regex_set,
            tenant: def.tenant_id,
            languages: def
                .languages
                .iter()
                .map(|l| primary_subtag(l))
                .collect(),
        })
    }

    fn applies_to(&self, tenant: &str, language: &str) -> bool {
        if let Some(ref only) = self.tenant {
            if only != tenant {
                return false;
            }
        }
        self.languages.is_empty() || self.languages.contains(&primary_subtag(language))
    }
}

fn primary_subtag(tag: &str) -> String {
    tag.split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Keyword rule evaluator backed by compiled regex sets.
pub struct KeywordRuleEvaluator {
    groups: HashMap<String, Vec<CompiledRule>>,
}

impl KeywordRuleEvaluator {
    /// Creates an evaluator with no rules.
    pub fn empty() -> Self {
        Self {
            groups: HashMap::new(),
        }
    }

    /// Creates an evaluator with the built-in rule set.
    pub fn with_defaults() -> Self {
        Self::from_definitions(Self::default_definitions())
            .expect("built-in rule patterns are valid")
    }

    /// Compiles rule definitions into an evaluator.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = RuleDefinition>,
    ) -> PolicyResult<Self> {
        let mut groups: HashMap<String, Vec<CompiledRule>> = HashMap::new();

        for def in definitions {
            let key = def
                .policy_version
                .clone()
                .unwrap_or_else(|| DEFAULT_RULE_SET.to_string());
            groups.entry(key).or_default().push(CompiledRule::compile(def)?);
        }

        Ok(Self { groups })
    }

    /// The built-in rules.
    pub fn default_definitions() -> Vec<RuleDefinition> {
        vec![
            RuleDefinition::new(
                "threat_keywords_v1",
                "violence_threat",
                0.85,
                &[
                    r"\b(kill|murder|stab|shoot)\s+(you|u)\b",
                    r"\bgoing\s+to\s+(kill|murder|hurt)\s+(you|u)\b",
                    r"\byou('re|\s+are)\s+(dead|going\s+to\s+die)\b",
                ],
            ),
            RuleDefinition::new(
                "minor_sexual_v1",
                "sexual_explicit",
                0.95,
                &[
                    r"\b(child|minor|underage)\s+(porn|sexual|nude)",
                    r"\bsexual\s+content\s+(involving|with)\s+(child|minor)",
                ],
            ),
        ]
    }

    /// Number of rules across all groups.
    pub fn rule_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    fn group_for(&self, policy_version: &str) -> &[CompiledRule] {
        self.groups
            .get(policy_version)
            .or_else(|| self.groups.get(DEFAULT_RULE_SET))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl Default for KeywordRuleEvaluator {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl RuleEvaluator for KeywordRuleEvaluator {
    fn evaluate(
        &self,
        text: &str,
        language: &str,
        tenant: &str,
        policy_version: &str,
    ) -> RuleEvaluation {
        let mut evaluation = RuleEvaluation::empty();

        for rule in self.group_for(policy_version) {
            if rule.applies_to(tenant, language) && rule.regex_set.is_match(text) {
                evaluation
                    .signals
                    .push(CategoryScore::rule(rule.category.clone(), rule.score));
                evaluation.fired.push(rule.id.clone());
            }
        }

        debug!(
            policy_version,
            tenant,
            fired = evaluation.fired.len(),
            "Rules evaluated"
        );
        evaluation
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}
