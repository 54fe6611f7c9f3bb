//! Policy documents.
//!
//! A policy document carries threshold tables and keyword rules in JSON.
//! Everything is validated at load time so a bad policy fails startup rather
//! than individual requests.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PolicyResult;
use crate::rules::{KeywordRuleEvaluator, RuleDefinition};
use crate::thresholds::{StaticThresholdStore, Thresholds};

/// Threshold overrides for one policy version, optionally for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyThresholds {
    pub policy_version: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub categories: Thresholds,
}

/// Threshold section of a policy document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSection {
    /// Replaces the built-in default table when present.
    #[serde(default)]
    pub default: Option<Thresholds>,
    #[serde(default)]
    pub policies: Vec<PolicyThresholds>,
}

/// A complete policy document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(default)]
    pub thresholds: ThresholdSection,
    /// Replaces the built-in rules when present.
    #[serde(default)]
    pub rules: Option<Vec<RuleDefinition>>,
}

impl PolicyDocument {
    /// Parses and validates a policy from JSON text.
    pub fn from_json(json: &str) -> PolicyResult<Self> {
        let doc: PolicyDocument = serde_json::from_str(json)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Reads, parses and validates a policy file.
    pub fn load(path: impl AsRef<Path>) -> PolicyResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let doc = Self::from_json(&json)?;

        info!(
            path = %path.display(),
            policies = doc.thresholds.policies.len(),
            rules = doc.rules.as_ref().map(Vec::len),
            "Loaded policy document"
        );
        Ok(doc)
    }

    /// Validates every threshold table and compiles every rule.
    pub fn validate(&self) -> PolicyResult<()> {
        if let Some(ref default) = self.thresholds.default {
            default.validate()?;
        }
        for policy in &self.thresholds.policies {
            policy.categories.validate()?;
        }
        if let Some(ref rules) = self.rules {
            KeywordRuleEvaluator::from_definitions(rules.iter().cloned())?;
        }
        Ok(())
    }

    /// Builds the threshold store described by this document.
    pub fn threshold_store(&self) -> StaticThresholdStore {
        let default = self
            .thresholds
            .default
            .clone()
            .unwrap_or_else(Thresholds::defaults);
        let mut store = StaticThresholdStore::new(default);

        // Version-wide policies first: tenant overrides build on them.
        let (tenant_scoped, version_wide): (Vec<_>, Vec<_>) = self
            .thresholds
            .policies
            .iter()
            .partition(|p| p.tenant_id.is_some());

        for policy in version_wide {
            store = store.with_policy(policy.policy_version.clone(), policy.categories.clone());
        }
        for policy in tenant_scoped {
            if let Some(ref tenant) = policy.tenant_id {
                store = store.with_tenant_policy(
                    tenant.clone(),
                    policy.policy_version.clone(),
                    policy.categories.clone(),
                );
            }
        }
        store
    }

    /// Builds the rule evaluator described by this document.
    pub fn rule_evaluator(&self) -> PolicyResult<KeywordRuleEvaluator> {
        match self.rules {
            Some(ref rules) => KeywordRuleEvaluator::from_definitions(rules.iter().cloned()),
            None => Ok(KeywordRuleEvaluator::with_defaults()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PolicyError;
    use crate::rules::RuleEvaluator;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "thresholds": {
            "policies": [
                {"policy_version": "v2", "tenant_id": "t1",
                 "categories": {"toxicity": {"block": 0.7, "soft": 0.5, "allow": 0.1}}},
                {"policy_version": "v2",
                 "categories": {"toxicity": {"block": 0.8, "soft": 0.6, "allow": 0.2}}}
            ]
        },
        "rules": [
            {"policy_version": "v2", "id": "slur_v2", "category": "identity_attack",
             "score": 0.93, "patterns": ["\\bslur\\b"]}
        ]
    }"#;

    #[test]
    fn empty_document_uses_defaults() {
        let doc = PolicyDocument::from_json("{}").unwrap();
        let store = doc.threshold_store();
        assert_eq!(store.resolve("t", "v1"), &Thresholds::defaults());
        assert!(doc.rule_evaluator().unwrap().rule_count() > 0);
    }

    #[test]
    fn sample_document_builds_store() {
        let doc = PolicyDocument::from_json(SAMPLE).unwrap();
        let store = doc.threshold_store();

        assert_eq!(store.resolve("t9", "v2").get("toxicity").unwrap().block, 0.8);
        assert_eq!(store.resolve("t1", "v2").get("toxicity").unwrap().block, 0.7);
        assert_eq!(store.resolve("t1", "v1").get("toxicity").unwrap().block, 0.92);
    }

    #[test]
    fn sample_document_builds_rules() {
        let doc = PolicyDocument::from_json(SAMPLE).unwrap();
        let rules = doc.rule_evaluator().unwrap();

        let eval = rules.evaluate("that slur again", "en", "t1", "v2");
        assert_eq!(eval.fired, vec!["slur_v2"]);
        // The document replaces the built-in rules entirely.
        assert!(!rules.evaluate("i will kill you", "en", "t1", "v1").has_matches());
    }

    #[test]
    fn invalid_thresholds_fail_load() {
        let json = r#"{"thresholds": {"default": {"toxicity": {"block": 0.5, "soft": 0.9, "allow": 0.1}}}}"#;
        let err = PolicyDocument::from_json(json).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidThreshold { .. }));
    }

    #[test]
    fn invalid_rule_fails_load() {
        let json = r#"{"rules": [{"id": "r", "category": "c", "score": 0.5, "patterns": ["("]}]}"#;
        let err = PolicyDocument::from_json(json).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidPattern { .. }));
    }

    #[test]
    fn malformed_json_fails_load() {
        assert!(matches!(
            PolicyDocument::from_json("{").unwrap_err(),
            PolicyError::Json(_)
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let doc = PolicyDocument::load(file.path()).unwrap();
        assert_eq!(doc.thresholds.policies.len(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = PolicyDocument::load("/nonexistent/policy.json").unwrap_err();
        assert!(matches!(err, PolicyError::Io(_)));
    }
}
