//! Pipeline coordinator - main crawl orchestration logic
//!
//! This module ties the stages together:
//! - Normalizing and de-duplicating seed URLs
//! - Fetching seeds on a bounded pool of concurrent workers
//! - Extracting and resolving links as fetches complete
//! - Buffering resolved links into batches
//! - Aggregating and persisting each batch

use crate::config::Config;
use crate::crawler::aggregator::aggregate;
use crate::crawler::extractor::{extractor_for, LinkExtractor};
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::resolver::{resolve, CachingResolver, DnsResolver, HostResolver, HostingInfo};
use crate::storage::{open_storage, PersistReport, Persister, SharedStorage};
use crate::url::normalize_seed;
use crate::HostwatchError;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Summary of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Seeds handed to the run, duplicates and invalid ones included
    pub seeds_submitted: usize,

    /// Seeds rejected by normalization
    pub seeds_skipped: usize,

    /// Seeds for which a response body was received
    pub pages_fetched: usize,

    /// Seeds whose every fetch attempt failed
    pub fetch_failures: Vec<String>,

    /// Links found across all fetched pages
    pub links_extracted: usize,

    /// Links with no domain or no resolvable address
    pub incomplete_links: usize,

    /// Non-empty batches written to the store
    pub batches_persisted: usize,

    /// Totals across all persisted batches
    pub persisted: PersistReport,
}

/// Main pipeline structure
pub struct Pipeline {
    config: Arc<Config>,
    fetcher: Fetcher,
    extractor: Arc<dyn LinkExtractor>,
    resolver: Arc<dyn HostResolver>,
    persister: Persister,
}

impl Pipeline {
    /// Creates a pipeline writing into `store`
    ///
    /// # Arguments
    ///
    /// * `config` - The pipeline configuration
    /// * `store` - Shared store handle, locked once per batch
    ///
    /// # Returns
    ///
    /// * `Ok(Pipeline)` - Successfully created pipeline
    /// * `Err(HostwatchError)` - The HTTP client could not be built
    pub fn new(config: Config, store: SharedStorage) -> Result<Self, HostwatchError> {
        let fetcher = Fetcher::new(&config.fetcher)?;
        let resolver = DnsResolver::new(config.fetcher.dns_timeout());
        let extractor: Arc<dyn LinkExtractor> = Arc::from(extractor_for(config.pipeline.parser));

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            extractor,
            resolver: Arc::new(resolver),
            persister: Persister::new(store),
        })
    }

    /// Replaces the link extractor
    pub fn with_extractor(mut self, extractor: impl LinkExtractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Replaces the host resolver
    pub fn with_resolver(mut self, resolver: impl HostResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Runs the pipeline over a set of seed URLs
    ///
    /// Per-URL and per-link failures are logged and counted in the report.
    /// Only a batch whose persist step fails stops the run; batches persisted
    /// before it stay in the store.
    pub async fn run<S: AsRef<str>>(&self, seeds: &[S]) -> Result<CrawlReport, HostwatchError> {
        let mut report = CrawlReport {
            seeds_submitted: seeds.len(),
            ..CrawlReport::default()
        };

        let (targets, skipped) = prepare_seeds(seeds);
        report.seeds_skipped = skipped;
        tracing::info!(
            "Starting run: {} seeds ({} skipped), {} workers, up to {} attempts per URL",
            targets.len(),
            skipped,
            self.config.fetcher.workers,
            self.fetcher.max_retries()
        );

        let mut fetches = self.spawn_fetches(targets);
        let resolver = CachingResolver::new(Arc::clone(&self.resolver));
        let batch_size = self.config.pipeline.batch_size.max(1);
        let mut buffer: Vec<(String, HostingInfo)> = Vec::with_capacity(batch_size);

        while let Some(joined) = fetches.join_next().await {
            let fetched = match joined {
                Ok(fetched) => fetched,
                Err(e) => {
                    tracing::error!("Fetch task failed: {}", e);
                    continue;
                }
            };

            match fetched {
                FetchResult::Success {
                    url,
                    status_code,
                    body,
                    attempts,
                } => {
                    tracing::info!(
                        "Fetched {} (HTTP {}, attempt {})",
                        url,
                        status_code,
                        attempts
                    );
                    report.pages_fetched += 1;

                    for link in self.extractor.extract(&body) {
                        report.links_extracted += 1;

                        let info = resolve(&resolver, &link).await;
                        if !info.is_complete() {
                            tracing::debug!(
                                "Dropping incomplete link {} (domain '{}', ip '{}')",
                                info.link(),
                                info.domain(),
                                info.ip()
                            );
                            report.incomplete_links += 1;
                            continue;
                        }

                        tracing::debug!("{} -> {} {}", info.link(), info.domain(), info.ip());
                        buffer.push((url.clone(), info));

                        if buffer.len() >= batch_size {
                            self.flush(&mut buffer, &mut report)?;
                        }
                    }
                }

                FetchResult::RetryExhausted {
                    url,
                    attempts,
                    error,
                } => {
                    tracing::warn!("Giving up on {} after {} attempts: {}", url, attempts, error);
                    report.fetch_failures.push(url);
                }
            }
        }

        self.flush(&mut buffer, &mut report)?;

        tracing::info!(
            "Run complete: {} pages, {} links, {} batches, {} records, {} fetch failures",
            report.pages_fetched,
            report.links_extracted,
            report.batches_persisted,
            report.persisted.records_persisted,
            report.fetch_failures.len()
        );

        Ok(report)
    }

    /// Starts one fetch task per target, at most `workers` running at once
    fn spawn_fetches(&self, targets: Vec<String>) -> JoinSet<FetchResult> {
        let permits = Arc::new(Semaphore::new(self.config.fetcher.workers.max(1)));
        let mut fetches = JoinSet::new();

        for url in targets {
            let fetcher = self.fetcher.clone();
            let permits = Arc::clone(&permits);
            fetches.spawn(async move {
                // The semaphore is never closed, so the permit is always granted
                let _permit = permits.acquire_owned().await.ok();
                fetcher.fetch(&url).await
            });
        }

        fetches
    }

    /// Aggregates and persists the buffered observations
    fn flush(
        &self,
        buffer: &mut Vec<(String, HostingInfo)>,
        report: &mut CrawlReport,
    ) -> Result<(), HostwatchError> {
        if buffer.is_empty() {
            return Ok(());
        }

        let batch = aggregate(buffer.iter());
        let observations = buffer.len();
        buffer.clear();

        let persisted = self.persister.persist(&batch)?;
        report.batches_persisted += 1;
        report.persisted.merge(&persisted);

        tracing::info!(
            "Persisted batch of {} observations from {} pages into {} (domain, ip) records",
            observations,
            batch.source_urls().len(),
            batch.len()
        );
        Ok(())
    }
}

/// Normalizes seeds, dropping invalid ones and repeats
///
/// Returns the distinct normalized URLs in submission order and the number of
/// seeds that failed normalization.
fn prepare_seeds<S: AsRef<str>>(seeds: &[S]) -> (Vec<String>, usize) {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    let mut skipped = 0;

    for raw in seeds {
        match normalize_seed(raw.as_ref()) {
            Ok(url) => {
                let url = url.to_string();
                if seen.insert(url.clone()) {
                    targets.push(url);
                } else {
                    tracing::debug!("Ignoring repeated seed {}", url);
                }
            }
            Err(e) => {
                tracing::warn!("Skipping seed '{}': {}", raw.as_ref(), e);
                skipped += 1;
            }
        }
    }

    (targets, skipped)
}

/// Runs one crawl against the configured database
///
/// # Example
///
/// ```no_run
/// use hostwatch::config::load_config;
/// use hostwatch::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("hostwatch.toml"))?;
/// let report = run_crawl(config, &["http://a.com"]).await?;
/// println!("{} records", report.persisted.records_persisted);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl<S: AsRef<str>>(
    config: Config,
    seeds: &[S],
) -> Result<CrawlReport, HostwatchError> {
    let storage = open_storage(Path::new(&config.storage.database_path))?;
    let pipeline = Pipeline::new(config, Arc::new(Mutex::new(storage)))?;
    pipeline.run(seeds).await
}
