use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use hostwatch::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Batch size: {}", config.pipeline.batch_size);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is logged at startup so a run can be tied to the exact file it used.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&content)))
}

/// Loads a configuration and returns both the config and its hash
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok((Config, String))` - Successfully loaded configuration and its hash
/// * `Err(ConfigError)` - Failed to load or parse the configuration
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    Ok((config, hex::encode(Sha256::digest(content.as_bytes()))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::ParserKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[fetcher]
timeout-secs = 5
dns-timeout-secs = 2
max-retries = 4
retry-delay-ms = 250
workers = 8
accept-invalid-certs = false

[pipeline]
batch-size = 50
parser = "fragment"

[storage]
database-path = "./test.db"

[housekeeping]
max-age-hours = 48

[server]
bind = "127.0.0.1:9100"
max-concurrent-jobs = 3
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.fetcher.timeout_secs, 5);
        assert_eq!(config.fetcher.dns_timeout_secs, 2);
        assert_eq!(config.fetcher.max_retries, 4);
        assert_eq!(config.fetcher.workers, 8);
        assert!(!config.fetcher.accept_invalid_certs);
        assert_eq!(config.pipeline.batch_size, 50);
        assert_eq!(config.pipeline.parser, ParserKind::Fragment);
        assert_eq!(config.housekeeping.max_age_hours, 48);
        assert_eq!(config.server.max_concurrent_jobs, 3);
    }

    #[test]
    fn test_optional_sections_use_defaults() {
        let config_content = r#"
[storage]
database-path = "./test.db"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.fetcher.timeout_secs, 3);
        assert_eq!(config.fetcher.dns_timeout_secs, 5);
        assert_eq!(config.fetcher.max_retries, 3);
        assert_eq!(config.fetcher.retry_delay_ms, 1000);
        assert!(config.fetcher.accept_invalid_certs);
        assert_eq!(config.pipeline.batch_size, 10);
        assert_eq!(config.pipeline.parser, ParserKind::Html);
        assert_eq!(config.housekeeping.max_age_hours, 24);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let config_content = "this is not valid TOML {{{";
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_parser_is_rejected() {
        let config_content = r#"
[pipeline]
parser = "regex"

[storage]
database-path = "./test.db"
"#;
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[fetcher]
workers = 0

[storage]
database-path = "./test.db"
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let config_content = "test content";
        let file = create_temp_config(config_content);

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        // Same content should produce same hash
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA-256 produces 64 hex characters
    }

    #[test]
    fn test_hash_matches_loaded_content() {
        let file = create_temp_config("[storage]\ndatabase-path = \"./a.db\"\n");
        let (_, hash) = load_config_with_hash(file.path()).unwrap();
        assert_eq!(hash, compute_config_hash(file.path()).unwrap());
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
