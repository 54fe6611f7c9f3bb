//! Guardian Storage - SQLite persistence layer.
//!
//! Backs the response cache with SQLite so cached verdicts survive a
//! restart. The core pipeline only sees the [`SqliteCacheStore`] through
//! its `CacheStore` trait.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use guardian_core::ResponseCache;
//! use guardian_storage::{Database, SqliteCacheStore};
//!
//! let db = Database::new().unwrap();
//! let cache = ResponseCache::new(Arc::new(SqliteCacheStore::new(db)));
//! ```

mod database;
pub mod error;
mod pool;
pub mod repository;
mod schema;
mod store;

pub use database::Database;
pub use error::{Result, StorageError};
pub use pool::ConnectionPool;
pub use repository::{CacheEntry, CacheRepo};
pub use store::SqliteCacheStore;
