use crate::config::types::{
    Config, FetcherConfig, PipelineConfig, ServerConfig, StorageConfig,
};
use crate::ConfigError;
use std::net::SocketAddr;

/// Upper bound on fetch attempts per URL
const MAX_ATTEMPTS: u32 = 10;

/// Upper bound on observations held in memory before a flush
const MAX_BATCH_SIZE: usize = 10_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher)?;
    validate_pipeline_config(&config.pipeline)?;
    validate_storage_config(&config.storage)?;
    validate_server_config(&config.server)?;
    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_retries < 1 || config.max_retries > MAX_ATTEMPTS {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 1 and {}, got {}",
            MAX_ATTEMPTS, config.max_retries
        )));
    }

    if config.dns_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "dns_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.workers < 1 || config.workers > 100 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 100, got {}",
            config.workers
        )));
    }

    Ok(())
}

/// Validates batch settings
fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, config.batch_size
        )));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates server configuration
fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.bind.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!("Invalid bind address '{}': {}", config.bind, e))
    })?;

    if config.max_concurrent_jobs < 1 {
        return Err(ConfigError::Validation(
            "max_concurrent_jobs must be >= 1".to_string(),
        ));
    }

    if config.max_request_bytes < 16 {
        return Err(ConfigError::Validation(format!(
            "max_request_bytes must be >= 16, got {}",
            config.max_request_bytes
        )));
    }

    Ok(())
}
