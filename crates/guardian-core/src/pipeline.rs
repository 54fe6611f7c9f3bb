//! The moderation pipeline.
//!
//! ```text
//! request → normalize → detect language → cache lookup ─hit─→ cached response
//!                                              │ miss
//!                          ┌───────────────────┴──────────────────┐
//!                          ▼                                      ▼
//!                    rule evaluator                     classifier gateway
//!                          └───────────────────┬──────────────────┘
//!                                              ▼
//!                              thresholds → decide → respond → cache
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::cache::{cache_key, ResponseCache};
use crate::classifier::{ClassifierGateway, ClassifierOutcome, DEFAULT_CLASSIFIER_TIMEOUT};
use crate::decision::decide;
use crate::language::LanguageDetector;
use crate::model::{ModerationRequest, ModerationResponse, RequestError, Sla};
use crate::normalize::normalize;
use crate::rules::RuleEvaluator;
use crate::thresholds::ThresholdStore;

/// Pipeline tuning.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on the classifier call, on top of the gateway's own timeout.
    pub classifier_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classifier_timeout: DEFAULT_CLASSIFIER_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    /// Sets the classifier timeout.
    pub fn with_classifier_timeout(mut self, timeout: Duration) -> Self {
        self.classifier_timeout = timeout;
        self
    }
}

/// Result of moderating one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationOutcome {
    pub response: ModerationResponse,
    /// True when the response came from the cache.
    pub cache_hit: bool,
}

/// Signal collection and decision for moderation requests.
///
/// Every collaborator is injected, so tests can swap in fakes. The pipeline
/// itself holds no mutable state and can be shared across tasks.
#[derive(Clone)]
pub struct ModerationPipeline {
    rules: Arc<dyn RuleEvaluator>,
    classifier: Arc<dyn ClassifierGateway>,
    thresholds: Arc<dyn ThresholdStore>,
    cache: ResponseCache,
    detector: LanguageDetector,
    config: PipelineConfig,
}

impl std::fmt::Debug for ModerationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModerationPipeline")
            .field("rules", &self.rules.name())
            .field("classifier", &self.classifier.name())
            .field("cache", &self.cache)
            .field("detector", &self.detector)
            .field("config", &self.config)
            .finish()
    }
}

impl ModerationPipeline {
    /// Creates a pipeline from its collaborators.
    pub fn new(
        rules: Arc<dyn RuleEvaluator>,
        classifier: Arc<dyn ClassifierGateway>,
        thresholds: Arc<dyn ThresholdStore>,
        cache: ResponseCache,
    ) -> Self {
        Self {
            rules,
            classifier,
            thresholds,
            cache,
            detector: LanguageDetector::new(),
            config: PipelineConfig::default(),
        }
    }

    /// Replaces the language detector.
    pub fn with_detector(mut self, detector: LanguageDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Replaces the pipeline configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Moderates a request.
    ///
    /// The only error is a structurally invalid request. Classifier, cache and
    /// threshold problems degrade the verdict instead of failing the call.
    pub async fn moderate(
        &self,
        request: &ModerationRequest,
    ) -> Result<ModerationOutcome, RequestError> {
        let start = Instant::now();
        request.validate()?;

        let text = normalize(&request.content.text);
        let language = self.detector.detect(&text, &request.content.lang_hint);
        let policy_version = request.effective_policy_version();
        let key = cache_key(&text, policy_version);

        debug!(
            request_id = %request.request_id,
            tenant = %request.tenant_id,
            policy_version,
            language = %language,
            text_len = text.len(),
            "Moderating request"
        );

        if let Some(response) = self.cache.get(&key).await {
            info!(
                request_id = %request.request_id,
                action = response.verdict.action.name(),
                "Served verdict from cache"
            );
            return Ok(ModerationOutcome {
                response,
                cache_hit: true,
            });
        }

        let (rules, model) = tokio::join!(
            async {
                self.rules
                    .evaluate(&text, &language, &request.tenant_id, policy_version)
            },
            self.classify(&text, &language),
        );

        let thresholds = self
            .thresholds
            .thresholds(&request.tenant_id, policy_version)
            .await;

        let mut signals = rules.signals;
        signals.extend_from_slice(model.signals());
        let verdict = decide(&signals, &thresholds, &model, &rules.fired, policy_version);

        let response = ModerationResponse {
            request_id: request.request_id.clone(),
            verdict,
            sla: Sla {
                latency_ms: start.elapsed().as_millis() as u64,
                mode: request.response_mode,
            },
        };

        info!(
            request_id = %request.request_id,
            tenant = %request.tenant_id,
            action = response.verdict.action.name(),
            classifier = ?model.status(),
            latency_ms = response.sla.latency_ms,
            "Moderation complete"
        );

        self.cache.set(&key, &response).await;

        Ok(ModerationOutcome {
            response,
            cache_hit: false,
        })
    }

    async fn classify(&self, text: &str, language: &str) -> ClassifierOutcome {
        match tokio::time::timeout(
            self.config.classifier_timeout,
            self.classifier.classify(text, language),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    classifier = self.classifier.name(),
                    timeout_ms = self.config.classifier_timeout.as_millis() as u64,
                    "Classifier timed out"
                );
                ClassifierOutcome::failed("timeout")
            }
        }
    }
}
