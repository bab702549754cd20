//! Configuration module for Hostwatch
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use hostwatch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("hostwatch.toml")).unwrap();
//! println!("Fetching with {} workers", config.fetcher.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FetcherConfig, HousekeepingConfig, ParserKind, PipelineConfig, ServerConfig,
    StorageConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
