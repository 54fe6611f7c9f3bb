//! Moderation request, verdict and response types.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::classifier::ClassifierStatus;
use crate::signal::CategoryScore;

/// Policy version applied when a request does not name one.
pub const DEFAULT_POLICY_VERSION: &str = "v1";

/// Content type accepted by the text pipeline.
pub const TEXT_CONTENT_TYPE: &str = "text";

/// Moderation action, ordered from least to most severe routing.
///
/// The derived ordering is the escalation order used by the decider:
/// `Allow < SoftBlock < Block < Escalate`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Content is fine.
    #[default]
    Allow,
    /// Content is hidden or flagged but not rejected.
    SoftBlock,
    /// Content is rejected.
    Block,
    /// Content goes to human or secondary review.
    Escalate,
}

impl Action {
    /// Returns the more severe of two actions.
    pub fn raise(self, other: Action) -> Action {
        self.max(other)
    }

    /// Severity reported for this action.
    pub fn severity(&self) -> Severity {
        match self {
            Action::Block | Action::Escalate => Severity::High,
            Action::SoftBlock => Severity::Medium,
            Action::Allow => Severity::Low,
        }
    }

    /// Returns the wire name of this action.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::SoftBlock => "soft_block",
            Action::Block => "block",
            Action::Escalate => "escalate",
        }
    }
}

/// Severity attached to a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// How the caller wants the response delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Deliver to the callback URL.
    Async,
    /// Answer in the HTTP response. Unknown modes read as sync.
    #[default]
    #[serde(other)]
    Sync,
}

/// Reads an explicit `null` as the field's default, like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The content under moderation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Content type. Only `text` (or empty) is accepted.
    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub content_type: String,
    /// The text itself.
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    /// Caller-declared language tag.
    #[serde(default, deserialize_with = "null_as_default")]
    pub lang_hint: String,
}

/// An inbound moderation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModerationRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tenant_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub request_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub response_mode: ResponseMode,
    /// Used only for async delivery, which lives outside the core.
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub policy_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Content,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Reasons a request is structurally unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("content.text is empty")]
    EmptyText,

    #[error("unsupported content type '{0}'")]
    UnsupportedContentType(String),
}

impl ModerationRequest {
    /// Creates a text request with default mode and policy.
    pub fn text(
        tenant_id: impl Into<String>,
        request_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            request_id: request_id.into(),
            content: Content {
                content_type: TEXT_CONTENT_TYPE.to_string(),
                text: text.into(),
                lang_hint: String::new(),
            },
            ..Default::default()
        }
    }

    /// Sets the policy version.
    pub fn with_policy_version(mut self, policy_version: impl Into<String>) -> Self {
        self.policy_version = policy_version.into();
        self
    }

    /// Sets the language hint.
    pub fn with_lang_hint(mut self, lang_hint: impl Into<String>) -> Self {
        self.content.lang_hint = lang_hint.into();
        self
    }

    /// Sets the response mode.
    pub fn with_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = mode;
        self
    }

    /// Checks that the request can be moderated at all.
    pub fn validate(&self) -> Result<(), RequestError> {
        let content_type = self.content.content_type.as_str();
        if !content_type.is_empty() && content_type != TEXT_CONTENT_TYPE {
            return Err(RequestError::UnsupportedContentType(content_type.to_string()));
        }
        if self.content.text.trim().is_empty() {
            return Err(RequestError::EmptyText);
        }
        Ok(())
    }

    /// The policy version in force, falling back to [`DEFAULT_POLICY_VERSION`].
    pub fn effective_policy_version(&self) -> &str {
        let version = self.policy_version.trim();
        if version.is_empty() {
            DEFAULT_POLICY_VERSION
        } else {
            version
        }
    }
}

/// Evidence behind a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explain {
    /// Identifiers of the rules that fired.
    pub rules_fired: Vec<String>,
    /// Raw explanation payload from the classifier.
    pub model: serde_json::Value,
    /// Whether the classifier answered.
    pub classifier: ClassifierStatus,
    /// `1 - max(score)` over all signals.
    pub uncertainty: f64,
    /// Policy version the thresholds came from.
    pub policy_version: String,
}

/// The final decision for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub action: Action,
    pub severity: Severity,
    /// One entry per category name, strongest signal kept, first-seen order.
    pub categories: Vec<CategoryScore>,
    pub explain: Explain,
}

/// Timing block of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sla {
    /// Time spent computing the verdict. Cached responses keep the original value.
    pub latency_ms: u64,
    pub mode: ResponseMode,
}

/// The response returned to callers and stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationResponse {
    pub request_id: String,
    pub verdict: Verdict,
    pub sla: Sla,
}
