//! SQLite-backed [`CacheStore`].

use std::time::Duration;

use async_trait::async_trait;
use guardian_core::{CacheError, CacheStore};
use tracing::debug;

use crate::database::Database;
use crate::error::StorageError;

impl From<StorageError> for CacheError {
    fn from(e: StorageError) -> Self {
        CacheError::Unavailable(e.to_string())
    }
}

/// Response cache persisted in SQLite.
///
/// Survives restarts, which keeps warm entries across deploys. Expired rows
/// are ignored on read and removed by [`SqliteCacheStore::purge_expired`].
#[derive(Clone)]
pub struct SqliteCacheStore {
    db: Database,
}

impl SqliteCacheStore {
    /// Wraps an open database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Removes expired rows.
    pub fn purge_expired(&self) -> Result<usize, StorageError> {
        let purged = self.db.purge_expired_cache()?;
        if purged > 0 {
            debug!(purged, "Purged expired cache entries");
        }
        Ok(purged)
    }

    /// Returns the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.db.cache_get(key)?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        Ok(self.db.cache_set(key, value, ttl)?)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
