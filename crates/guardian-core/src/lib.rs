//! Guardian Core - Moderation signals and verdict decision.
//!
//! This crate turns a piece of user text into a moderation verdict. It handles:
//!
//! - Text normalization (NFKC, case folding, whitespace collapse)
//! - Language resolution
//! - Keyword rules scoped by policy version, tenant and language
//! - The external classifier gateway, with graceful degradation
//! - Per-policy threshold tables
//! - The decision step (action, severity, uncertainty, explanation)
//! - Response caching keyed by normalized text and policy version
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use guardian_core::{
//!     DisabledClassifier, KeywordRuleEvaluator, ModerationPipeline, ModerationRequest,
//!     ResponseCache, StaticThresholdStore,
//! };
//!
//! # async fn run() {
//! let pipeline = ModerationPipeline::new(
//!     Arc::new(KeywordRuleEvaluator::with_defaults()),
//!     Arc::new(DisabledClassifier),
//!     Arc::new(StaticThresholdStore::with_defaults()),
//!     ResponseCache::disabled(),
//! );
//!
//! let request = ModerationRequest::text("tenant-1", "req-1", "I will kill you");
//! let outcome = pipeline.moderate(&request).await.unwrap();
//! println!("{}", outcome.response.verdict.action.name());
//! # }
//! ```

pub mod cache;
pub mod classifier;
pub mod decision;
pub mod error;
pub mod language;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod policy;
pub mod rules;
pub mod signal;
pub mod thresholds;

pub use cache::{cache_key, CacheStore, InMemoryCacheStore, NullCacheStore, ResponseCache};
pub use classifier::{
    ClassifierConfig, ClassifierError, ClassifierGateway, ClassifierOutcome, ClassifierStatus,
    DisabledClassifier, HttpClassifierGateway,
};
pub use decision::decide;
pub use error::{CacheError, PolicyError, PolicyResult};
pub use language::LanguageDetector;
pub use model::{
    Action, Content, Explain, ModerationRequest, ModerationResponse, RequestError, ResponseMode,
    Severity, Sla, Verdict,
};
pub use normalize::normalize;
pub use pipeline::{ModerationOutcome, ModerationPipeline, PipelineConfig};
pub use policy::PolicyDocument;
pub use rules::{KeywordRuleEvaluator, RuleDefinition, RuleEvaluation, RuleEvaluator};
pub use signal::{CategoryScore, SignalSource};
pub use thresholds::{StaticThresholdStore, Threshold, ThresholdStore, Thresholds};
