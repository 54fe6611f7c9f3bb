//! HTTP classifier gateway.
//!
//! Speaks the classifier service's JSON protocol:
//!
//! ```text
//! POST {base_url}/classify  {"text": "...", "lang": "en", "pii_redact": false}
//! 200 {"categories": [{"name": "toxicity", "score": 0.12, "source": "model"}],
//!      "explain": {"model": "detoxify-multilingual", "pii_spans": []}}
//! ```

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ClassifierGateway, ClassifierOutcome};
use crate::signal::CategoryScore;

/// Default per-call timeout. Leaves headroom inside a 5 s request budget.
pub const DEFAULT_CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors from a single classifier call.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// Connection, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("unexpected status: {0}")]
    Status(u16),

    /// The body did not match the expected schema.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Configuration for the HTTP classifier gateway.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Base URL of the classifier service, e.g. `http://ml:8000`.
    pub base_url: String,
    /// Timeout for a whole call, connect included.
    pub timeout: Duration,
    /// Ask the classifier to redact PII before scoring.
    pub pii_redact: bool,
}

impl ClassifierConfig {
    /// Creates a config for `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_CLASSIFIER_TIMEOUT,
            pii_redact: false,
        }
    }

    /// Sets the call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enables or disables PII redaction.
    pub fn with_pii_redact(mut self, pii_redact: bool) -> Self {
        self.pii_redact = pii_redact;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/classify", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
    lang: &'a str,
    pii_redact: bool,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    categories: Vec<WireCategory>,
    #[serde(default = "empty_object")]
    explain: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WireCategory {
    name: String,
    score: f64,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

/// Classifier gateway over HTTP.
#[derive(Debug, Clone)]
pub struct HttpClassifierGateway {
    client: reqwest::Client,
    endpoint: String,
    pii_redact: bool,
}

impl HttpClassifierGateway {
    /// Builds a gateway from its configuration.
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            endpoint: config.endpoint(),
            pii_redact: config.pii_redact,
            client,
        })
    }

    /// Returns the URL the gateway posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, text: &str, language: &str) -> Result<ClassifyResponse, ClassifierError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ClassifyRequest {
                text,
                lang: language,
                pii_redact: self.pii_redact,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifierError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ClassifierGateway for HttpClassifierGateway {
    async fn classify(&self, text: &str, language: &str) -> ClassifierOutcome {
        let start = Instant::now();

        match self.request(text, language).await {
            Ok(response) => {
                let mut signals = Vec::with_capacity(response.categories.len());
                for category in response.categories {
                    if !category.score.is_finite() {
                        warn!(category = %category.name, "Dropping non-finite classifier score");
                        continue;
                    }
                    signals.push(CategoryScore::model(category.name, category.score));
                }

                debug!(
                    signals = signals.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Classifier answered"
                );
                ClassifierOutcome::Healthy {
                    signals,
                    explain: response.explain,
                }
            }
            Err(e) => {
                warn!(
                    endpoint = %self.endpoint,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Classifier call failed: {}",
                    e
                );
                ClassifierOutcome::failed(e.to_string())
            }
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
