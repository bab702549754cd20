//! Job submission front-end
//!
//! A small line-oriented JSON service over TCP: clients submit lists of seed
//! URLs, the server validates them, acknowledges with a job id and runs the
//! crawl on a bounded pool of jobs.

mod listener;
mod protocol;

pub use listener::JobServer;
pub use protocol::{encode_response, parse_request, JobRequest, JobResponse, RequestError};
