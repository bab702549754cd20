//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{DomainIpRecord, UrlRecord};
use chrono::{DateTime, Utc};
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    /// Returns true if the error concerns a single row only
    ///
    /// Row-level errors (constraint violations, values the store refuses)
    /// are logged and skipped; anything else means the store itself is in
    /// trouble and the current batch must stop.
    pub fn is_row_level(&self) -> bool {
        match self {
            Self::ConstraintViolation(_) => true,
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                ErrorCode::ConstraintViolation | ErrorCode::TooBig | ErrorCode::TypeMismatch
            ),
            Self::Sqlite(rusqlite::Error::ToSqlConversionFailure(_)) => true,
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The three write operations are idempotent upserts keyed by the store's
/// uniqueness constraints; the pipeline relies on that to tolerate replays.
pub trait Storage {
    // ===== Upserts =====

    /// Inserts a URL if absent, otherwise refreshes its modification time
    ///
    /// Returns the URL's stable id either way.
    fn upsert_url(&mut self, url: &str) -> StorageResult<i64>;

    /// Inserts a (domain, ip) pair with `counter = delta`, or adds `delta`
    /// to the stored counter if the pair already exists
    ///
    /// Returns the pair's id.
    fn upsert_domain_ip(&mut self, domain: &str, ip: &str, delta: u64) -> StorageResult<i64>;

    /// Links a (domain, ip) row to a URL row if not already linked
    ///
    /// Returns true if a new link was created, false if it already existed.
    fn link_url_to_domain_ip(&mut self, domain_ip_id: i64, url_id: i64) -> StorageResult<bool>;

    // ===== Housekeeping =====

    /// Deletes URL rows created before `cutoff`, along with their links
    ///
    /// Returns the number of URL rows removed.
    fn delete_urls_older_than(&mut self, cutoff: DateTime<Utc>) -> StorageResult<u64>;

    // ===== Lookups =====

    /// Gets a URL row by its text
    fn get_url(&self, url: &str) -> StorageResult<Option<UrlRecord>>;

    /// Gets a (domain, ip) row
    fn get_domain_ip(&self, domain: &str, ip: &str) -> StorageResult<Option<DomainIpRecord>>;

    /// Gets the ids of URLs linked to a (domain, ip) row, ascending
    fn get_linked_url_ids(&self, domain_ip_id: i64) -> StorageResult<Vec<i64>>;

    // ===== Statistics =====

    /// Counts URL rows
    fn count_urls(&self) -> StorageResult<u64>;

    /// Counts (domain, ip) rows
    fn count_domain_ips(&self) -> StorageResult<u64>;

    /// Counts link rows
    fn count_links(&self) -> StorageResult<u64>;

    /// Sum of all (domain, ip) counters
    fn total_counter(&self) -> StorageResult<u64>;

    /// Gets the pairs with the highest counters
    fn top_domain_ips(&self, limit: usize) -> StorageResult<Vec<DomainIpRecord>>;
}
