//! Core error types.

use thiserror::Error;

/// Errors raised while loading or validating a policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A threshold triple violates `0 <= allow <= soft <= block <= 1`.
    #[error("invalid thresholds for category '{category}': {reason}")]
    InvalidThreshold { category: String, reason: String },

    /// A rule pattern failed to compile.
    #[error("invalid pattern in rule '{rule_id}': {source}")]
    InvalidPattern {
        rule_id: String,
        #[source]
        source: regex::Error,
    },

    /// A rule definition is unusable.
    #[error("invalid rule '{rule_id}': {reason}")]
    InvalidRule { rule_id: String, reason: String },

    /// The policy file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The policy file is not valid JSON for the policy schema.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors reported by a cache store.
///
/// The pipeline never surfaces these to callers; they only degrade caching.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store could not serve the operation.
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    /// A cached payload could not be encoded or decoded.
    #[error("cache payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Result type for policy operations.
pub type PolicyResult<T> = std::result::Result<T, PolicyError>;
