//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Where moderation responses are cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackend {
    /// Process-local map.
    Memory,
    /// SQLite file, survives restarts.
    Sqlite,
    /// No caching.
    None,
}

/// Content Guardian - text moderation service
#[derive(Parser, Debug, Clone)]
#[command(name = "guardian", version, about)]
pub struct Args {
    /// Host to bind the HTTP server to
    #[arg(long, env = "GUARDIAN_HOST", default_value = guardian_server::DEFAULT_HOST)]
    pub host: String,

    /// Port to bind the HTTP server to
    #[arg(long, env = "PORT", default_value_t = guardian_server::DEFAULT_PORT)]
    pub port: u16,

    /// Base URL of the classifier service (disabled when absent)
    #[arg(long, env = "CLASSIFIER_URL")]
    pub classifier_url: Option<String>,

    /// Classifier call timeout in milliseconds
    #[arg(long, env = "CLASSIFIER_TIMEOUT_MS", default_value_t = 2000)]
    pub classifier_timeout_ms: u64,

    /// Whole-request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 5000)]
    pub request_timeout_ms: u64,

    /// Ask the classifier to redact PII before scoring
    #[arg(long, env = "CLASSIFIER_PII_REDACT")]
    pub pii_redact: bool,

    /// Response cache backend
    #[arg(long, env = "GUARDIAN_CACHE", value_enum, default_value_t = CacheBackend::Memory)]
    pub cache: CacheBackend,

    /// SQLite cache file (defaults to the platform data directory)
    #[arg(long, env = "GUARDIAN_CACHE_DB")]
    pub cache_db: Option<PathBuf>,

    /// Cache entry lifetime in seconds
    #[arg(long, env = "GUARDIAN_CACHE_TTL_SECS", default_value_t = 600)]
    pub cache_ttl_secs: u64,

    /// JSON policy file with thresholds and rules
    #[arg(long, env = "GUARDIAN_POLICY_FILE")]
    pub policy_file: Option<PathBuf>,

    /// Language tag used when a request carries no hint
    #[arg(long, env = "GUARDIAN_DEFAULT_LANGUAGE", default_value = guardian_core::language::DEFAULT_LANGUAGE)]
    pub default_language: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, env = "GUARDIAN_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Also write daily-rotated log files to this directory
    #[arg(long, env = "GUARDIAN_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Args {
    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_millis(self.classifier_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
