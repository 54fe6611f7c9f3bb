//! Builds the service components from command-line arguments.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use guardian_core::{
    ClassifierConfig, ClassifierGateway, DisabledClassifier, HttpClassifierGateway,
    InMemoryCacheStore, LanguageDetector, ModerationPipeline, PipelineConfig, PolicyDocument,
    ResponseCache,
};
use guardian_server::ServerConfig;
use guardian_storage::{Database, SqliteCacheStore};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cli::{Args, CacheBackend};

/// Everything `main` needs to serve requests.
pub struct Components {
    pub pipeline: ModerationPipeline,
    /// Set when the SQLite cache is in use, for background purging.
    pub sqlite_cache: Option<SqliteCacheStore>,
}

/// Loads the policy file, or the built-in policy when none is given.
pub fn load_policy(args: &Args) -> anyhow::Result<PolicyDocument> {
    match args.policy_file {
        Some(ref path) => PolicyDocument::load(path)
            .with_context(|| format!("failed to load policy file {}", path.display())),
        None => {
            info!("No policy file given, using built-in thresholds and rules");
            Ok(PolicyDocument::default())
        }
    }
}

/// Builds the classifier gateway.
pub fn build_classifier(args: &Args) -> anyhow::Result<Arc<dyn ClassifierGateway>> {
    match args.classifier_url {
        Some(ref url) => {
            let config = ClassifierConfig::new(url.clone())
                .with_timeout(args.classifier_timeout())
                .with_pii_redact(args.pii_redact);
            let gateway =
                HttpClassifierGateway::new(config).context("failed to build classifier client")?;
            info!(endpoint = gateway.endpoint(), "Classifier enabled");
            Ok(Arc::new(gateway))
        }
        None => {
            warn!("No classifier URL configured, verdicts use rules only");
            Ok(Arc::new(DisabledClassifier))
        }
    }
}

/// Builds the response cache for the selected backend.
pub fn build_cache(args: &Args) -> anyhow::Result<(ResponseCache, Option<SqliteCacheStore>)> {
    let ttl = args.cache_ttl();

    match args.cache {
        CacheBackend::Memory => Ok((
            ResponseCache::with_ttl(Arc::new(InMemoryCacheStore::new()), ttl),
            None,
        )),
        CacheBackend::Sqlite => {
            let db = match args.cache_db {
                Some(ref path) => Database::with_path(path),
                None => Database::new(),
            }
            .context("failed to open cache database")?;

            let store = SqliteCacheStore::new(db);
            Ok((
                ResponseCache::with_ttl(Arc::new(store.clone()), ttl),
                Some(store),
            ))
        }
        CacheBackend::None => Ok((ResponseCache::disabled(), None)),
    }
}

/// Builds the moderation pipeline and its supporting handles.
pub fn build(args: &Args) -> anyhow::Result<Components> {
    // A classifier timeout must fire before the request timeout does.
    anyhow::ensure!(
        args.classifier_timeout() < args.request_timeout(),
        "--classifier-timeout-ms ({}) must be less than --request-timeout-ms ({})",
        args.classifier_timeout_ms,
        args.request_timeout_ms
    );

    let policy = load_policy(args)?;
    let rules = policy
        .rule_evaluator()
        .context("failed to compile policy rules")?;
    let thresholds = policy.threshold_store();
    let classifier = build_classifier(args)?;
    let (cache, sqlite_cache) = build_cache(args)?;

    info!(
        rules = rules.rule_count(),
        cache = ?args.cache,
        ttl_secs = cache.ttl().as_secs(),
        "Pipeline configured"
    );

    let pipeline = ModerationPipeline::new(Arc::new(rules), classifier, Arc::new(thresholds), cache)
        .with_detector(LanguageDetector::with_default(args.default_language.clone()))
        .with_config(PipelineConfig::default().with_classifier_timeout(args.classifier_timeout()));

    Ok(Components {
        pipeline,
        sqlite_cache,
    })
}

/// Server settings from the arguments.
pub fn server_config(args: &Args) -> ServerConfig {
    ServerConfig::default()
        .with_host(args.host.clone())
        .with_port(args.port)
        .with_request_timeout(args.request_timeout())
}

/// Periodically removes expired rows from the SQLite cache.
pub fn spawn_cache_purge(store: SqliteCacheStore, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(Duration::from_secs(1)));
        loop {
            interval.tick().await;
            if let Err(e) = store.purge_expired() {
                warn!("Cache purge failed: {}", e);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use guardian_core::{Action, ModerationRequest};
    use std::io::Write;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["guardian"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn default_build_moderates() {
        let components = build(&args(&[])).unwrap();
        assert!(components.sqlite_cache.is_none());

        let request = ModerationRequest::text("t1", "r1", "I will kill you");
        let outcome = components.pipeline.moderate(&request).await.unwrap();
        assert_eq!(outcome.response.verdict.action, Action::SoftBlock);
    }

    #[tokio::test]
    async fn sqlite_backend_uses_given_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let path_arg = path.to_str().unwrap();

        let components = build(&args(&["--cache", "sqlite", "--cache-db", path_arg])).unwrap();
        let store = components.sqlite_cache.unwrap();

        let request = ModerationRequest::text("t1", "r1", "hello");
        components.pipeline.moderate(&request).await.unwrap();
        assert_eq!(store.database().cache_count().unwrap(), 1);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn none_backend_never_hits() {
        let components = build(&args(&["--cache", "none"])).unwrap();
        let request = ModerationRequest::text("t1", "r1", "hello");

        components.pipeline.moderate(&request).await.unwrap();
        let second = components.pipeline.moderate(&request).await.unwrap();
        assert!(!second.cache_hit);
    }

    #[tokio::test]
    async fn policy_file_replaces_rules() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{"rules": [{"id": "spam_v1", "category": "spam", "score": 0.99,
                 "patterns": ["buy now"]}],
                 "thresholds": {"default": {"spam": {"block": 0.95, "soft": 0.5, "allow": 0.1}}}}"#,
        )
        .unwrap();
        let path_arg = file.path().to_str().unwrap().to_string();

        let components = build(&args(&["--policy-file", &path_arg])).unwrap();
        let request = ModerationRequest::text("t1", "r1", "BUY NOW cheap pills");
        let outcome = components.pipeline.moderate(&request).await.unwrap();

        assert_eq!(outcome.response.verdict.action, Action::Block);
        assert_eq!(outcome.response.verdict.explain.rules_fired, vec!["spam_v1"]);
    }

    #[test]
    fn bad_policy_file_fails_startup() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"rules": [{"id": "r", "category": "c", "score": 0.5, "patterns": ["("]}]}"#)
            .unwrap();
        let path_arg = file.path().to_str().unwrap().to_string();

        assert!(build(&args(&["--policy-file", &path_arg])).is_err());
        assert!(build(&args(&["--policy-file", "/nonexistent/policy.json"])).is_err());
    }

    #[test]
    fn classifier_timeout_must_undercut_request_timeout() {
        let err = build(&args(&[
            "--classifier-timeout-ms",
            "5000",
            "--request-timeout-ms",
            "5000",
        ]))
        .err()
        .unwrap();
        assert!(err.to_string().contains("--classifier-timeout-ms"));

        assert!(build(&args(&["--classifier-timeout-ms", "6000"])).is_err());
        assert!(build(&args(&["--classifier-timeout-ms", "4999"])).is_ok());
    }

    #[test]
    fn classifier_url_enables_gateway() {
        let classifier = build_classifier(&args(&["--classifier-url", "http://localhost:9"])).unwrap();
        assert_eq!(classifier.name(), "http");

        let disabled = build_classifier(&args(&[])).unwrap();
        assert_eq!(disabled.name(), "disabled");
    }

    #[test]
    fn server_config_follows_args() {
        let config = server_config(&args(&["--host", "127.0.0.1", "--port", "9100", "--request-timeout-ms", "750"]));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9100);
        assert_eq!(config.request_timeout, Duration::from_millis(750));
    }
}
