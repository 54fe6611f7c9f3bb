//! Cache entry repository.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;

/// A stored cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Returns true if the entry is still live at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Repository for cache entry operations.
pub struct CacheRepo;

impl CacheRepo {
    /// Get an entry, live or expired.
    pub fn get(conn: &Connection, key: &str) -> Result<Option<CacheEntry>> {
        let entry = conn
            .query_row(
                "SELECT key, value, expires_at FROM cache_entries WHERE key = ?1",
                [key],
                |row| {
                    let expires_ms: i64 = row.get(2)?;
                    Ok(CacheEntry {
                        key: row.get(0)?,
                        value: row.get(1)?,
                        expires_at: Utc
                            .timestamp_millis_opt(expires_ms)
                            .single()
                            .unwrap_or(DateTime::<Utc>::MIN_UTC),
                    })
                },
            )
            .optional()?;

        Ok(entry)
    }

    /// Get the value under `key` if it has not expired at `now`.
    pub fn get_live(conn: &Connection, key: &str, now: DateTime<Utc>) -> Result<Option<String>> {
        let value = conn
            .query_row(
                "SELECT value FROM cache_entries WHERE key = ?1 AND expires_at > ?2",
                params![key, now.timestamp_millis()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    /// Set an entry (insert or replace).
    pub fn set(
        conn: &Connection,
        key: &str,
        value: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        conn.execute(
            "INSERT INTO cache_entries (key, value, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = ?2,
                expires_at = ?3,
                created_at = datetime('now')",
            params![key, value, expires_at.timestamp_millis()],
        )?;

        Ok(())
    }

    /// Delete an entry.
    pub fn delete(conn: &Connection, key: &str) -> Result<bool> {
        let deleted = conn.execute("DELETE FROM cache_entries WHERE key = ?1", [key])?;
        Ok(deleted > 0)
    }

    /// Delete every entry expired at `now`. Returns the number removed.
    pub fn purge_expired(conn: &Connection, now: DateTime<Utc>) -> Result<usize> {
        let purged = conn.execute(
            "DELETE FROM cache_entries WHERE expires_at <= ?1",
            [now.timestamp_millis()],
        )?;
        Ok(purged)
    }

    /// Count entries, expired ones included.
    pub fn count(conn: &Connection) -> Result<i64> {
        let count = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::run_migrations;
    use chrono::Duration;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_set_and_get() {
        let conn = setup_db();
        let now = Utc::now();
        let expires = now + Duration::minutes(10);

        CacheRepo::set(&conn, "mcache:abc", "{\"a\":1}", expires).unwrap();
        let entry = CacheRepo::get(&conn, "mcache:abc").unwrap().unwrap();

        assert_eq!(entry.key, "mcache:abc");
        assert_eq!(entry.value, "{\"a\":1}");
        assert_eq!(entry.expires_at.timestamp_millis(), expires.timestamp_millis());
        assert!(entry.is_live(now));
    }

    #[test]
    fn test_get_live_skips_expired() {
        let conn = setup_db();
        let now = Utc::now();

        CacheRepo::set(&conn, "old", "x", now - Duration::seconds(1)).unwrap();
        CacheRepo::set(&conn, "new", "y", now + Duration::seconds(60)).unwrap();

        assert_eq!(CacheRepo::get_live(&conn, "old", now).unwrap(), None);
        assert_eq!(
            CacheRepo::get_live(&conn, "new", now).unwrap().as_deref(),
            Some("y")
        );
        assert_eq!(CacheRepo::get_live(&conn, "missing", now).unwrap(), None);
    }

    #[test]
    fn test_update_existing() {
        let conn = setup_db();
        let expires = Utc::now() + Duration::minutes(1);

        CacheRepo::set(&conn, "k", "original", expires).unwrap();
        CacheRepo::set(&conn, "k", "updated", expires).unwrap();

        let entry = CacheRepo::get(&conn, "k").unwrap().unwrap();
        assert_eq!(entry.value, "updated");
        assert_eq!(CacheRepo::count(&conn).unwrap(), 1);
    }

    #[test]
    fn test_delete() {
        let conn = setup_db();
        CacheRepo::set(&conn, "k", "v", Utc::now() + Duration::minutes(1)).unwrap();

        assert!(CacheRepo::delete(&conn, "k").unwrap());
        assert!(!CacheRepo::delete(&conn, "k").unwrap());
        assert!(CacheRepo::get(&conn, "k").unwrap().is_none());
    }

    #[test]
    fn test_purge_expired() {
        let conn = setup_db();
        let now = Utc::now();

        CacheRepo::set(&conn, "a", "1", now - Duration::minutes(5)).unwrap();
        CacheRepo::set(&conn, "b", "2", now - Duration::seconds(1)).unwrap();
        CacheRepo::set(&conn, "c", "3", now + Duration::minutes(5)).unwrap();

        assert_eq!(CacheRepo::purge_expired(&conn, now).unwrap(), 2);
        assert_eq!(CacheRepo::count(&conn).unwrap(), 1);
        assert!(CacheRepo::get(&conn, "c").unwrap().is_some());
    }
}
