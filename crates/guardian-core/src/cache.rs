//! Response cache.
//!
//! Responses are memoized by (normalized text, policy version) for a short
//! TTL. The key deliberately ignores tenant and request id, so identical
//! submissions share one entry. A hit is returned verbatim, including the
//! `latency_ms` and `request_id` of the computation that produced it.
//!
//! Caching never affects correctness: store failures read as misses and
//! failed writes are dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::CacheError;
use crate::model::ModerationResponse;

/// Namespace prefix for every key written by the pipeline.
pub const CACHE_KEY_PREFIX: &str = "mcache:";

/// How long a response stays cached.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Derives the cache key for a normalized text under a policy version.
pub fn cache_key(normalized_text: &str, policy_version: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized_text.as_bytes());
    hasher.update(b"|");
    hasher.update(policy_version.as_bytes());
    format!("{}{:x}", CACHE_KEY_PREFIX, hasher.finalize())
}

/// Key-value store with per-entry expiry.
///
/// Eviction belongs to the store; callers only read and write.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the live value under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `value` under `key` for `ttl`, replacing any previous value.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Returns the name of this store for logging.
    fn name(&self) -> &'static str;
}

/// Process-local cache store.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl InMemoryCacheStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Unavailable("cache lock poisoned".to_string()))?;

        match entries.get(key) {
            Some((value, expires_at)) if Instant::now() < *expires_at => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Unavailable("cache lock poisoned".to_string()))?;

        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| now < *expires_at);
        entries.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Store that never holds anything. Used when caching is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCacheStore;

#[async_trait]
impl CacheStore for NullCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Typed response cache over an injected [`CacheStore`].
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("store", &self.store.name())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl ResponseCache {
    /// Creates a cache with [`DEFAULT_CACHE_TTL`].
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_ttl(store, DEFAULT_CACHE_TTL)
    }

    /// Creates a cache with a custom TTL.
    pub fn with_ttl(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// A cache that never hits.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullCacheStore))
    }

    /// Returns the entry TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Looks up a response. Store errors and undecodable payloads are misses.
    pub async fn get(&self, key: &str) -> Option<ModerationResponse> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(store = self.store.name(), "Cache read failed, treating as miss: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(response) => {
                debug!(key, "Cache hit");
                Some(response)
            }
            Err(e) => {
                warn!(key, "Discarding undecodable cache entry: {}", e);
                None
            }
        }
    }

    /// Stores a response. Failures are logged and otherwise ignored.
    pub async fn set(&self, key: &str, response: &ModerationResponse) {
        let raw = match serde_json::to_string(response) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, "Failed to encode response for cache: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.set(key, &raw, self.ttl).await {
            warn!(store = self.store.name(), "Cache write failed, skipping: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierStatus;
    use crate::model::{Action, Explain, ResponseMode, Severity, Sla, Verdict};
    use crate::signal::CategoryScore;

    fn response(request_id: &str, latency_ms: u64) -> ModerationResponse {
        ModerationResponse {
            request_id: request_id.to_string(),
            verdict: Verdict {
                action: Action::SoftBlock,
                severity: Severity::Medium,
                categories: vec![CategoryScore::rule("violence_threat", 0.85)],
                explain: Explain {
                    rules_fired: vec!["threat_keywords_v1".to_string()],
                    model: serde_json::json!({}),
                    classifier: ClassifierStatus::Failed,
                    uncertainty: 0.15,
                    policy_version: "v1".to_string(),
                },
            },
            sla: Sla {
                latency_ms,
                mode: ResponseMode::Sync,
            },
        }
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_string()))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn key_is_deterministic_and_prefixed() {
        let a = cache_key("i will kill you", "v1");
        let b = cache_key("i will kill you", "v1");
        assert_eq!(a, b);
        assert!(a.starts_with(CACHE_KEY_PREFIX));
        // sha256 hex digest
        assert_eq!(a.len(), CACHE_KEY_PREFIX.len() + 64);
    }

    #[test]
    fn key_depends_on_policy_version() {
        assert_ne!(cache_key("hello", "v1"), cache_key("hello", "v2"));
        assert_ne!(cache_key("hello", "v1"), cache_key("hello!", "v1"));
    }

    #[test]
    fn key_matches_joined_digest() {
        let mut hasher = Sha256::new();
        hasher.update(b"hello|v1");
        let expected = format!("mcache:{:x}", hasher.finalize());
        assert_eq!(cache_key("hello", "v1"), expected);
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = InMemoryCacheStore::new();
        assert!(store.is_empty());
        store.set("k", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.get("missing").await.unwrap(), None);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn memory_store_expires_entries() {
        let store = InMemoryCacheStore::new();
        store.set("k", "v", Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn memory_store_sweeps_expired_on_write() {
        let store = InMemoryCacheStore::new();
        for i in 0..1000 {
            store
                .set(&format!("k{}", i), "v", Duration::from_millis(1))
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        store.set("fresh", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("fresh").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn memory_store_last_write_wins() {
        let store = InMemoryCacheStore::new();
        store.set("k", "first", Duration::from_secs(60)).await.unwrap();
        store.set("k", "second", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn response_cache_round_trip_keeps_latency() {
        let cache = ResponseCache::new(Arc::new(InMemoryCacheStore::new()));
        let key = cache_key("i will kill you", "v1");

        assert!(cache.get(&key).await.is_none());
        cache.set(&key, &response("r1", 42)).await;

        let hit = cache.get(&key).await.unwrap();
        assert_eq!(hit, response("r1", 42));
        assert_eq!(hit.sla.latency_ms, 42);
    }

    #[tokio::test]
    async fn broken_store_degrades_to_miss() {
        let cache = ResponseCache::new(Arc::new(BrokenStore));
        let key = cache_key("x", "v1");
        cache.set(&key, &response("r1", 1)).await;
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn undecodable_entry_is_miss() {
        let store = Arc::new(InMemoryCacheStore::new());
        store.set("k", "{not json", Duration::from_secs(60)).await.unwrap();

        let cache = ResponseCache::new(store);
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn disabled_cache_never_hits() {
        let cache = ResponseCache::disabled();
        cache.set("k", &response("r1", 1)).await;
        assert!(cache.get("k").await.is_none());
        assert_eq!(cache.ttl(), DEFAULT_CACHE_TTL);
    }
}
