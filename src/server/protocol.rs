//! Job submission wire format
//!
//! One JSON object per line in each direction. A request names the seed URLs
//! of one crawl job:
//!
//! ```text
//! {"urls": ["http://a.com", "http://b.com"]}
//! ```
//!
//! and is answered with either
//!
//! ```text
//! {"status":"accepted","job_id":1,"urls":2}
//! {"status":"error","message":"..."}
//! ```

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A validated crawl job request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub urls: Vec<String>,
}

/// Reasons a request line is rejected
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Request too large: more than {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Request is not valid UTF-8")]
    InvalidEncoding,

    #[error("Malformed JSON: {0}")]
    Malformed(String),

    #[error("Request must be a JSON object")]
    NotAnObject,

    #[error("Missing 'urls' field")]
    MissingUrls,

    #[error("'urls' must be an array of strings")]
    InvalidUrls,

    #[error("'urls' must not be empty")]
    EmptyUrls,
}

/// Server reply to one request line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobResponse {
    Accepted { job_id: u64, urls: usize },
    Error { message: String },
}

impl JobResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

impl From<RequestError> for JobResponse {
    fn from(err: RequestError) -> Self {
        Self::error(err.to_string())
    }
}

/// Parses and validates one request line
///
/// The trailing line terminator, if any, is ignored. Seed URLs are not
/// checked here; invalid ones are skipped by the pipeline like any other.
pub fn parse_request(line: &[u8]) -> Result<JobRequest, RequestError> {
    let text = std::str::from_utf8(line).map_err(|_| RequestError::InvalidEncoding)?;
    let value: Value =
        serde_json::from_str(text.trim()).map_err(|e| RequestError::Malformed(e.to_string()))?;

    let object = value.as_object().ok_or(RequestError::NotAnObject)?;
    let urls = object.get("urls").ok_or(RequestError::MissingUrls)?;
    let urls = urls.as_array().ok_or(RequestError::InvalidUrls)?;

    if urls.is_empty() {
        return Err(RequestError::EmptyUrls);
    }

    let urls = urls
        .iter()
        .map(|url| url.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or(RequestError::InvalidUrls)?;

    Ok(JobRequest { urls })
}

/// Serializes a response as a single line, terminator included
pub fn encode_response(response: &JobResponse) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(response)?;
    line.push('\n');
    Ok(line)
}
