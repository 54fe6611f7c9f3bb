//! High-level database interface.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use tracing::info;

use crate::error::{Result, StorageError};
use crate::pool::ConnectionPool;
use crate::repository::{CacheEntry, CacheRepo};

/// High-level database interface for Content Guardian.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Create a new database in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Create a new database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        Ok(Self { pool })
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "content-guardian", "guardian")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))?;

        Ok(proj_dirs.data_dir().join("guardian-cache.db"))
    }

    // === Cache ===

    /// Get a live cache value.
    pub fn cache_get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.pool.get()?;
        CacheRepo::get_live(&conn, key, Utc::now())
    }

    /// Get a cache entry regardless of expiry.
    pub fn cache_entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        let conn = self.pool.get()?;
        CacheRepo::get(&conn, key)
    }

    /// Store a cache value that expires after `ttl`.
    pub fn cache_set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let conn = self.pool.get()?;
        CacheRepo::set(&conn, key, value, expiry_after(Utc::now(), ttl))
    }

    /// Delete a cache value.
    pub fn cache_delete(&self, key: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        CacheRepo::delete(&conn, key)
    }

    /// Remove expired cache entries.
    pub fn purge_expired_cache(&self) -> Result<usize> {
        let conn = self.pool.get()?;
        CacheRepo::purge_expired(&conn, Utc::now())
    }

    /// Count cache entries, expired ones included.
    pub fn cache_count(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        CacheRepo::count(&conn)
    }
}

/// `now + ttl`, saturating at the largest representable time.
fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_round_trip() {
        let db = Database::in_memory().unwrap();

        db.cache_set("k", "v", Duration::from_secs(60)).unwrap();
        assert_eq!(db.cache_get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(db.cache_count().unwrap(), 1);

        assert!(db.cache_delete("k").unwrap());
        assert_eq!(db.cache_get("k").unwrap(), None);
    }

    #[test]
    fn test_zero_ttl_is_never_live() {
        let db = Database::in_memory().unwrap();

        db.cache_set("k", "v", Duration::ZERO).unwrap();
        assert_eq!(db.cache_get("k").unwrap(), None);
        assert!(db.cache_entry("k").unwrap().is_some());
        assert_eq!(db.purge_expired_cache().unwrap(), 1);
        assert_eq!(db.cache_count().unwrap(), 0);
    }

    #[test]
    fn test_with_path_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.db");

        {
            let db = Database::with_path(&path).unwrap();
            db.cache_set("k", "v", Duration::from_secs(60)).unwrap();
        }

        let db = Database::with_path(&path).unwrap();
        assert_eq!(db.cache_get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_expiry_saturates() {
        let now = Utc::now();
        assert_eq!(expiry_after(now, Duration::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(
            expiry_after(now, Duration::from_secs(1)),
            now + chrono::Duration::seconds(1)
        );
    }
}
