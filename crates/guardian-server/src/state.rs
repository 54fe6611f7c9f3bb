//! Application state for the API server.

use std::sync::Arc;
use std::time::Duration;

use guardian_core::{
    DisabledClassifier, KeywordRuleEvaluator, ModerationPipeline, ResponseCache,
    StaticThresholdStore,
};

/// Default bound on a whole moderation request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The moderation pipeline.
    pub pipeline: Arc<ModerationPipeline>,
    /// Upper bound on one moderation call.
    pub request_timeout: Duration,
}

impl AppState {
    /// Creates application state around a pipeline.
    pub fn new(pipeline: ModerationPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Built-in rules and thresholds, no classifier, no cache.
    pub fn standalone() -> Self {
        Self::new(ModerationPipeline::new(
            Arc::new(KeywordRuleEvaluator::with_defaults()),
            Arc::new(DisabledClassifier),
            Arc::new(StaticThresholdStore::with_defaults()),
            ResponseCache::disabled(),
        ))
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
