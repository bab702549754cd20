//! Batch persistence
//!
//! One [`Persister::persist`] call applies one aggregated batch to the store.
//! Writes are not wrapped in a transaction: each statement commits on its
//! own, a row-level failure skips just that row, and anything else stops the
//! batch and is reported as [`HostwatchError::PersistenceFailure`] after the
//! unapplied keys have been logged for manual replay.

use crate::crawler::{AggregateBatch, AggregateKey, AggregateRecord};
use crate::storage::{SqliteStorage, Storage, StorageError, StorageResult};
use crate::HostwatchError;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Store handle shared between the pipeline and the job server
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Counts of what one or more persist steps wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistReport {
    /// URL upserts that succeeded
    pub urls_upserted: u64,

    /// (domain, ip) upserts that succeeded
    pub records_persisted: u64,

    /// Link rows newly created
    pub links_created: u64,

    /// Rows skipped because of row-level errors
    pub rows_skipped: u64,
}

impl PersistReport {
    pub fn merge(&mut self, other: &PersistReport) {
        self.urls_upserted += other.urls_upserted;
        self.records_persisted += other.records_persisted;
        self.links_created += other.links_created;
        self.rows_skipped += other.rows_skipped;
    }
}

/// Applies aggregated batches to a store
///
/// The store is locked for the duration of a single batch and released when
/// `persist` returns, whatever the outcome.
pub struct Persister<S: Storage = SqliteStorage> {
    store: Arc<Mutex<S>>,
}

impl<S: Storage> Clone for Persister<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Storage> Persister<S> {
    pub fn new(store: Arc<Mutex<S>>) -> Self {
        Self { store }
    }

    /// Persists one batch
    ///
    /// An empty batch returns immediately without touching the store.
    pub fn persist(&self, batch: &AggregateBatch) -> Result<PersistReport, HostwatchError> {
        if batch.is_empty() {
            return Ok(PersistReport::default());
        }

        let mut store = self
            .store
            .lock()
            .map_err(|_| HostwatchError::Storage(StorageError::LockPoisoned))?;

        persist_batch(&mut *store, batch)
    }
}

/// Cache of URL ids for one batch; `None` marks a URL whose upsert was skipped
type UrlIds = HashMap<String, Option<i64>>;

fn persist_batch<S: Storage + ?Sized>(
    store: &mut S,
    batch: &AggregateBatch,
) -> Result<PersistReport, HostwatchError> {
    let mut report = PersistReport::default();
    let mut url_ids = UrlIds::new();
    let records: Vec<(&AggregateKey, &AggregateRecord)> = batch.iter().collect();

    for (index, (key, record)) in records.iter().enumerate() {
        if let Err(source) = persist_record(store, key, record, &mut url_ids, &mut report) {
            log_unpersisted(&records[index..]);
            tracing::error!(
                "Persist step aborted at ({}) +{}: {}",
                key,
                record.count,
                source
            );
            return Err(HostwatchError::PersistenceFailure {
                key: key.to_string(),
                delta: record.count,
                source,
            });
        }
    }

    tracing::debug!(
        "Persisted batch: {} urls, {} records, {} new links, {} skipped",
        report.urls_upserted,
        report.records_persisted,
        report.links_created,
        report.rows_skipped
    );

    Ok(report)
}

/// Persists one record; only non-row-level errors are returned
fn persist_record<S: Storage + ?Sized>(
    store: &mut S,
    key: &AggregateKey,
    record: &AggregateRecord,
    url_ids: &mut UrlIds,
    report: &mut PersistReport,
) -> StorageResult<()> {
    let mut linked_urls = Vec::with_capacity(record.urls.len());
    for url in &record.urls {
        if let Some(id) = url_id(store, url, url_ids, report)? {
            linked_urls.push(id);
        }
    }

    let domain_ip_id = match store.upsert_domain_ip(&key.domain, &key.ip, record.count) {
        Ok(id) => id,
        Err(e) if e.is_row_level() => {
            tracing::warn!("Skipping ({}) +{}: {}", key, record.count, e);
            report.rows_skipped += 1;
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    report.records_persisted += 1;

    for url_id in linked_urls {
        match store.link_url_to_domain_ip(domain_ip_id, url_id) {
            Ok(true) => report.links_created += 1,
            Ok(false) => {}
            Err(e) if e.is_row_level() => {
                tracing::warn!("Skipping link ({}) -> url {}: {}", key, url_id, e);
                report.rows_skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

/// Upserts a URL once per batch and remembers the outcome
fn url_id<S: Storage + ?Sized>(
    store: &mut S,
    url: &str,
    url_ids: &mut UrlIds,
    report: &mut PersistReport,
) -> StorageResult<Option<i64>> {
    if let Some(cached) = url_ids.get(url) {
        return Ok(*cached);
    }

    let id = match store.upsert_url(url) {
        Ok(id) => {
            report.urls_upserted += 1;
            Some(id)
        }
        Err(e) if e.is_row_level() => {
            tracing::warn!("Skipping url {}: {}", url, e);
            report.rows_skipped += 1;
            None
        }
        Err(e) => return Err(e),
    };

    url_ids.insert(url.to_string(), id);
    Ok(id)
}

fn log_unpersisted(remaining: &[(&AggregateKey, &AggregateRecord)]) {
    for (key, record) in remaining {
        let urls: Vec<&str> = record.urls.iter().map(String::as_str).collect();
        tracing::error!(
            "Not persisted: ({}) +{} from [{}]",
            key,
            record.count,
            urls.join(", ")
        );
    }
}

/// Deletes URL rows created more than `max_age` ago
///
/// Returns the number of rows removed.
pub fn purge_old_urls<S: Storage + ?Sized>(store: &mut S, max_age: Duration) -> StorageResult<u64> {
    let cutoff = Utc::now() - max_age;
    let deleted = store.delete_urls_older_than(cutoff)?;
    tracing::info!("Purged {} url rows created before {}", deleted, cutoff);
    Ok(deleted)
}
