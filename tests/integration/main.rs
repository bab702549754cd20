//! Integration tests for Hostwatch
//!
//! Mock HTTP servers stand in for the crawled sites and a static resolver
//! stands in for DNS, so these tests never leave the machine.

mod pipeline_tests;
mod server_tests;
