//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{DomainIpRecord, UrlRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

/// Formats a timestamp so that lexical order matches time order
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn counter_param(delta: u64) -> StorageResult<i64> {
    i64::try_from(delta)
        .map_err(|_| StorageError::ConstraintViolation(format!("counter delta {} too large", delta)))
}

fn domain_ip_from_row(row: &Row<'_>) -> rusqlite::Result<DomainIpRecord> {
    Ok(DomainIpRecord {
        id: row.get(0)?,
        domain: row.get(1)?,
        ip: row.get(2)?,
        counter: row.get::<_, i64>(3)? as u64,
    })
}

impl SqliteStorage {
    /// Opens (or creates) a database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Upserts a URL using `now` as the creation/modification time
    pub fn upsert_url_at(&mut self, url: &str, now: DateTime<Utc>) -> StorageResult<i64> {
        let now = timestamp(now);
        let id = self.conn.query_row(
            "INSERT INTO urls (url, creation_time, modification_time) VALUES (?1, ?2, ?2)
             ON CONFLICT(url) DO UPDATE SET modification_time = excluded.modification_time
             RETURNING id",
            params![url, now],
            |row| row.get(0),
        )?;
        Ok(id)
    }
}

impl Storage for SqliteStorage {
    // ===== Upserts =====

    fn upsert_url(&mut self, url: &str) -> StorageResult<i64> {
        self.upsert_url_at(url, Utc::now())
    }

    fn upsert_domain_ip(&mut self, domain: &str, ip: &str, delta: u64) -> StorageResult<i64> {
        let delta = counter_param(delta)?;
        let id = self.conn.query_row(
            "INSERT INTO domain_ip (domain, ip, counter) VALUES (?1, ?2, ?3)
             ON CONFLICT(domain, ip) DO UPDATE SET counter = counter + excluded.counter
             RETURNING id",
            params![domain, ip, delta],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn link_url_to_domain_ip(&mut self, domain_ip_id: i64, url_id: i64) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO domain_ip_urls (domain_ip_id, url_id) VALUES (?1, ?2)
             ON CONFLICT(domain_ip_id, url_id) DO NOTHING",
            params![domain_ip_id, url_id],
        )?;
        Ok(inserted == 1)
    }

    // ===== Housekeeping =====

    fn delete_urls_older_than(&mut self, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        let deleted = self.conn.execute(
            "DELETE FROM urls WHERE creation_time < ?1",
            params![timestamp(cutoff)],
        )?;
        Ok(deleted as u64)
    }

    // ===== Lookups =====

    fn get_url(&self, url: &str) -> StorageResult<Option<UrlRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, url, creation_time, modification_time FROM urls WHERE url = ?1",
                params![url],
                |row| {
                    Ok(UrlRecord {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        creation_time: row.get(2)?,
                        modification_time: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn get_domain_ip(&self, domain: &str, ip: &str) -> StorageResult<Option<DomainIpRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, domain, ip, counter FROM domain_ip WHERE domain = ?1 AND ip = ?2",
                params![domain, ip],
                domain_ip_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn get_linked_url_ids(&self, domain_ip_id: i64) -> StorageResult<Vec<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT url_id FROM domain_ip_urls WHERE domain_ip_id = ?1 ORDER BY url_id",
        )?;

        let ids = stmt
            .query_map(params![domain_ip_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ids)
    }

    // ===== Statistics =====

    fn count_urls(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_domain_ips(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM domain_ip", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_links(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM domain_ip_urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn total_counter(&self) -> StorageResult<u64> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(counter), 0) FROM domain_ip",
            [],
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }

    fn top_domain_ips(&self, limit: usize) -> StorageResult<Vec<DomainIpRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, domain, ip, counter FROM domain_ip
             ORDER BY counter DESC, domain ASC, ip ASC
             LIMIT ?1",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(params![limit], domain_ip_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}
