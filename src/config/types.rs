use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Hostwatch
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub housekeeping: HousekeepingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Builds a configuration with every optional section at its default
    pub fn with_database(database_path: impl Into<String>) -> Self {
        Self {
            fetcher: FetcherConfig::default(),
            pipeline: PipelineConfig::default(),
            storage: StorageConfig {
                database_path: database_path.into(),
            },
            housekeeping: HousekeepingConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Network fetch behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FetcherConfig {
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// Per-lookup name resolution timeout (seconds)
    pub dns_timeout_secs: u64,

    /// Total number of attempts per URL
    pub max_retries: u32,

    /// Fixed delay between attempts (milliseconds)
    pub retry_delay_ms: u64,

    /// Number of concurrent fetch workers
    pub workers: usize,

    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
}

impl FetcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_secs(self.dns_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 3,
            dns_timeout_secs: 5,
            max_retries: 3,
            retry_delay_ms: 1000,
            workers: 10,
            accept_invalid_certs: true,
        }
    }
}

/// Which link extractor variant to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    /// Full HTML document parse
    #[default]
    Html,
    /// HTML fragment parse, for bodies that are snippets rather than documents
    Fragment,
}

/// Batch processing settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PipelineConfig {
    /// Number of resolved links aggregated and persisted together
    pub batch_size: usize,

    /// Link extractor variant
    pub parser: ParserKind,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            parser: ParserKind::Html,
        }
    }
}

/// Store location
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub database_path: String,
}

/// Periodic cleanup of old URL rows
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HousekeepingConfig {
    /// URL rows created more than this many hours ago are purged
    pub max_age_hours: u32,
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self { max_age_hours: 24 }
    }
}

/// Job-submission server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind: String,

    /// Number of crawl jobs allowed to run at once
    pub max_concurrent_jobs: usize,

    /// Largest accepted request line
    pub max_request_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            max_concurrent_jobs: 2,
            max_request_bytes: 64 * 1024,
        }
    }
}
