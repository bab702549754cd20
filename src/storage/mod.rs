//! Storage module for persisting aggregated hosting data
//!
//! This module handles all database operations for the pipeline, including:
//! - SQLite database initialization and schema management
//! - Idempotent upserts of URLs, (domain, ip) counters and their links
//! - Per-batch persistence with row-level error isolation
//! - Housekeeping of old URL rows

mod persister;
mod schema;
mod sqlite;
mod traits;

pub use persister::{purge_old_urls, PersistReport, Persister, SharedStorage};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a crawled URL in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    pub id: i64,
    pub url: String,
    pub creation_time: String,
    pub modification_time: String,
}

/// Represents a (domain, ip) pair and how often it was observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainIpRecord {
    pub id: i64,
    pub domain: String,
    pub ip: String,
    pub counter: u64,
}
