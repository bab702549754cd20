//! Hostwatch: outbound link hosting mapper
//!
//! This crate fetches a set of seed pages, extracts their outbound links,
//! resolves each link's host to an IP address and keeps a running count of
//! every (domain, ip) pair it has observed in a SQLite store.

pub mod config;
pub mod crawler;
pub mod output;
pub mod server;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Hostwatch operations
#[derive(Debug, Error)]
pub enum HostwatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    /// The store became unreachable while a batch was being persisted.
    /// Carries the key and delta that failed so the batch can be replayed.
    #[error("Persisting ({key}) +{delta} failed: {source}")]
    PersistenceFailure {
        key: String,
        delta: u64,
        source: storage::StorageError,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Reasons a seed URL is rejected
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Hostwatch operations
pub type Result<T> = std::result::Result<T, HostwatchError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, HostingInfo, Pipeline};
pub use url::{domain_of, normalize_seed};
