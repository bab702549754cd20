//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client from fetcher configuration
//! - GET requests with a fixed per-call timeout
//! - Bounded retry of transport failures with a fixed delay
//!
//! Any response that arrives is treated as fetchable content regardless of
//! its status code. Only transport-level failures (timeouts, refused
//! connections, TLS errors, broken bodies) are retried.

use crate::config::FetcherConfig;
use crate::crawler::retry::{retry, RetryOutcome};
use reqwest::Client;
use std::time::Duration;

/// Result of fetching one seed URL
#[derive(Debug)]
pub enum FetchResult {
    /// A response was received
    Success {
        /// The URL that was requested
        url: String,
        /// HTTP status code (informational only)
        status_code: u16,
        /// Response body as text
        body: String,
        /// Attempt on which the response arrived
        attempts: u32,
    },

    /// Every attempt failed at the transport level
    RetryExhausted {
        /// The URL that was requested
        url: String,
        /// Number of attempts made
        attempts: u32,
        /// Description of the final failure
        error: String,
    },
}

impl FetchResult {
    /// The URL this result belongs to
    pub fn url(&self) -> &str {
        match self {
            Self::Success { url, .. } | Self::RetryExhausted { url, .. } => url,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use hostwatch::config::FetcherConfig;
/// use hostwatch::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let user_agent = format!("hostwatch/{}", env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(config.timeout())
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages with bounded retry
///
/// Cloning is cheap; the underlying client shares its connection pool, so
/// each fetch worker holds its own clone.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl Fetcher {
    /// Creates a fetcher and its HTTP client from configuration
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?, config))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, config: &FetcherConfig) -> Self {
        Self {
            client,
            timeout: config.timeout(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        }
    }

    /// Overrides the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Maximum number of attempts per URL
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Fetches a URL, retrying transport failures
    ///
    /// Never returns an error: exhaustion is reported as
    /// [`FetchResult::RetryExhausted`] so one bad URL cannot fail a batch.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let client = &self.client;
        let timeout = self.timeout;

        let outcome = retry(self.max_retries, self.retry_delay, |attempt| async move {
            tracing::debug!("Requesting {} (attempt {})", url, attempt);

            let result = async {
                let response = client.get(url).timeout(timeout).send().await?;
                let status_code = response.status().as_u16();
                let body = response.text().await?;
                Ok::<_, reqwest::Error>((status_code, body))
            }
            .await;

            if let Err(e) = &result {
                tracing::debug!("Attempt {} for {} failed: {}", attempt, url, describe_error(e));
            }
            result
        })
        .await;

        match outcome {
            RetryOutcome::Success {
                value: (status_code, body),
                attempts,
            } => FetchResult::Success {
                url: url.to_string(),
                status_code,
                body,
                attempts,
            },
            RetryOutcome::RetryExhausted {
                attempts,
                last_error,
            } => FetchResult::RetryExhausted {
                url: url.to_string(),
                attempts,
                error: describe_error(&last_error),
            },
        }
    }
}

/// Classifies a transport error into a short description
fn describe_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("Request timeout: {}", error)
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else if error.is_body() || error.is_decode() {
        format!("Body read failed: {}", error)
    } else {
        error.to_string()
    }
}
