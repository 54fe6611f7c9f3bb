//! Per-category decision thresholds and the stores that resolve them.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, PolicyResult};

/// Block / soft-block / allow cut-offs for one category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    /// Scores at or above this block the content.
    pub block: f64,
    /// Scores at or above this (and below `block`) soft-block the content.
    pub soft: f64,
    /// Scores at or below this are considered clean.
    pub allow: f64,
}

impl Threshold {
    /// Creates a threshold triple without validating it.
    pub const fn new(block: f64, soft: f64, allow: f64) -> Self {
        Self { block, soft, allow }
    }

    /// Checks `0 <= allow <= soft <= block <= 1`.
    pub fn validate(&self, category: &str) -> PolicyResult<()> {
        let invalid = |reason: String| PolicyError::InvalidThreshold {
            category: category.to_string(),
            reason,
        };

        for (label, value) in [("block", self.block), ("soft", self.soft), ("allow", self.allow)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!("{label}={value} is outside [0, 1]")));
            }
        }
        if self.allow > self.soft {
            return Err(invalid(format!(
                "allow={} is greater than soft={}",
                self.allow, self.soft
            )));
        }
        if self.soft > self.block {
            return Err(invalid(format!(
                "soft={} is greater than block={}",
                self.soft, self.block
            )));
        }
        Ok(())
    }
}

/// Mapping from category name to its thresholds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Thresholds {
    categories: HashMap<String, Threshold>,
}

impl Thresholds {
    /// Creates an empty table. Every category is unthresholded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(category, threshold)` pairs, validating each.
    pub fn from_entries<I, S>(entries: I) -> PolicyResult<Self>
    where
        I: IntoIterator<Item = (S, Threshold)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (name, threshold) in entries {
            table.insert(name, threshold)?;
        }
        Ok(table)
    }

    /// The built-in table applied when no policy overrides it.
    pub fn defaults() -> Self {
        let entries = [
            ("toxicity", Threshold::new(0.92, 0.75, 0.3)),
            ("sexual_explicit", Threshold::new(0.9, 0.7, 0.2)),
            ("identity_attack", Threshold::new(0.9, 0.7, 0.3)),
            ("violence_threat", Threshold::new(0.9, 0.7, 0.3)),
            ("profanity", Threshold::new(0.95, 0.8, 0.0)),
        ];
        Self {
            categories: entries
                .into_iter()
                .map(|(name, t)| (name.to_string(), t))
                .collect(),
        }
    }

    /// Inserts or replaces the thresholds for a category after validating them.
    pub fn insert(&mut self, name: impl Into<String>, threshold: Threshold) -> PolicyResult<()> {
        let name = name.into();
        threshold.validate(&name)?;
        self.categories.insert(name, threshold);
        Ok(())
    }

    /// Returns the thresholds for a category.
    ///
    /// `None` means the category has no threshold and cannot raise the action.
    pub fn get(&self, name: &str) -> Option<&Threshold> {
        self.categories.get(name)
    }

    /// Validates every entry. Used after deserializing untrusted tables.
    pub fn validate(&self) -> PolicyResult<()> {
        self.categories
            .iter()
            .try_for_each(|(name, t)| t.validate(name))
    }

    /// Returns a copy of `self` with every entry of `other` laid on top.
    pub fn overlay(&self, other: &Thresholds) -> Thresholds {
        let mut merged = self.clone();
        for (name, t) in &other.categories {
            merged.categories.insert(name.clone(), *t);
        }
        merged
    }

    /// Number of thresholded categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Returns true if no category is thresholded.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Resolves the thresholds that apply to a tenant under a policy version.
///
/// This is the seam for a dynamic policy backend; the decider only ever sees
/// the resolved [`Thresholds`].
#[async_trait]
pub trait ThresholdStore: Send + Sync {
    /// Returns the thresholds for `tenant` under `policy_version`.
    async fn thresholds(&self, tenant: &str, policy_version: &str) -> Thresholds;
}

/// In-process threshold store.
///
/// Resolution order, most specific first: (tenant, policy version), policy
/// version, default table. Overrides are laid on top of the default table so
/// a policy only needs to list the categories it changes.
#[derive(Debug, Clone)]
pub struct StaticThresholdStore {
    default: Thresholds,
    by_version: HashMap<String, Thresholds>,
    by_tenant: HashMap<(String, String), Thresholds>,
}

impl StaticThresholdStore {
    /// Creates a store serving `default` for every tenant and version.
    pub fn new(default: Thresholds) -> Self {
        Self {
            default,
            by_version: HashMap::new(),
            by_tenant: HashMap::new(),
        }
    }

    /// Creates a store serving [`Thresholds::defaults`].
    pub fn with_defaults() -> Self {
        Self::new(Thresholds::defaults())
    }

    /// Adds an override for every tenant under `policy_version`.
    pub fn with_policy(mut self, policy_version: impl Into<String>, overrides: Thresholds) -> Self {
        let merged = self.default.overlay(&overrides);
        self.by_version.insert(policy_version.into(), merged);
        self
    }

    /// Adds an override for one tenant under `policy_version`.
    pub fn with_tenant_policy(
        mut self,
        tenant: impl Into<String>,
        policy_version: impl Into<String>,
        overrides: Thresholds,
    ) -> Self {
        let policy_version = policy_version.into();
        let base = self
            .by_version
            .get(&policy_version)
            .unwrap_or(&self.default)
            .overlay(&overrides);
        self.by_tenant.insert((tenant.into(), policy_version), base);
        self
    }

    /// Synchronous lookup used by the async trait impl.
    pub fn resolve(&self, tenant: &str, policy_version: &str) -> &Thresholds {
        self.by_tenant
            .get(&(tenant.to_string(), policy_version.to_string()))
            .or_else(|| self.by_version.get(policy_version))
            .unwrap_or(&self.default)
    }
}

impl Default for StaticThresholdStore {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[async_trait]
impl ThresholdStore for StaticThresholdStore {
    async fn thresholds(&self, tenant: &str, policy_version: &str) -> Thresholds {
        self.resolve(tenant, policy_version).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let t = Thresholds::defaults();
        assert_eq!(t.len(), 5);
        t.validate().unwrap();

        let violence = t.get("violence_threat").unwrap();
        assert_eq!(violence.block, 0.9);
        assert_eq!(violence.soft, 0.7);
    }

    #[test]
    fn missing_category_is_none() {
        assert!(Thresholds::defaults().get("insult").is_none());
        assert!(Thresholds::new().is_empty());
    }

    #[test]
    fn validate_rejects_out_of_order() {
        let err = Threshold::new(0.5, 0.7, 0.1).validate("toxicity").unwrap_err();
        assert!(matches!(err, PolicyError::InvalidThreshold { ref category, .. } if category == "toxicity"));

        assert!(Threshold::new(0.9, 0.7, 0.8).validate("x").is_err());
    }

    #[test]
    fn validate_rejects_out_of_range() {
        assert!(Threshold::new(1.2, 0.7, 0.1).validate("x").is_err());
        assert!(Threshold::new(0.9, 0.7, -0.1).validate("x").is_err());
        assert!(Threshold::new(f64::NAN, 0.7, 0.1).validate("x").is_err());
    }

    #[test]
    fn validate_accepts_equal_bounds() {
        Threshold::new(0.5, 0.5, 0.5).validate("x").unwrap();
        Threshold::new(1.0, 0.0, 0.0).validate("x").unwrap();
    }

    #[test]
    fn insert_validates() {
        let mut t = Thresholds::new();
        assert!(t.insert("bad", Threshold::new(0.1, 0.2, 0.3)).is_err());
        assert!(t.is_empty());
        t.insert("good", Threshold::new(0.3, 0.2, 0.1)).unwrap();
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn deserialized_table_can_be_validated() {
        let t: Thresholds =
            serde_json::from_str(r#"{"toxicity": {"block": 0.2, "soft": 0.5, "allow": 0.1}}"#)
                .unwrap();
        assert!(t.validate().is_err());
    }

    #[tokio::test]
    async fn static_store_resolution_order() {
        let v2 = Thresholds::from_entries([("toxicity", Threshold::new(0.8, 0.6, 0.2))]).unwrap();
        let t1 = Thresholds::from_entries([("toxicity", Threshold::new(0.7, 0.5, 0.1))]).unwrap();

        let store = StaticThresholdStore::with_defaults()
            .with_policy("v2", v2)
            .with_tenant_policy("t1", "v2", t1);

        let default = store.thresholds("t9", "v1").await;
        assert_eq!(default.get("toxicity").unwrap().block, 0.92);

        let version = store.thresholds("t9", "v2").await;
        assert_eq!(version.get("toxicity").unwrap().block, 0.8);
        // Untouched categories come from the default table.
        assert_eq!(version.get("profanity").unwrap().block, 0.95);

        let tenant = store.thresholds("t1", "v2").await;
        assert_eq!(tenant.get("toxicity").unwrap().block, 0.7);
        assert_eq!(tenant.get("violence_threat").unwrap().block, 0.9);

        // Tenant overrides are scoped to their version.
        let other = store.thresholds("t1", "v1").await;
        assert_eq!(other.get("toxicity").unwrap().block, 0.92);
    }
}
