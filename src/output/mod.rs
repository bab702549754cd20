//! Output module for run summaries and reports
//!
//! This module handles:
//! - Rendering the summary of a pipeline run
//! - Reading aggregate statistics back out of the store

pub mod stats;

pub use stats::{format_statistics, load_statistics, print_statistics, HostStatistics};

use crate::crawler::CrawlReport;

/// Renders a run summary for the terminal
///
/// # Arguments
///
/// * `report` - The report returned by a pipeline run
pub fn format_crawl_report(report: &CrawlReport) -> String {
    let mut out = String::new();

    out.push_str("=== Run Summary ===\n\n");
    out.push_str(&format!(
        "Seeds: {} submitted, {} skipped\n",
        report.seeds_submitted, report.seeds_skipped
    ));
    out.push_str(&format!("Pages fetched: {}\n", report.pages_fetched));
    out.push_str(&format!(
        "Links: {} extracted, {} incomplete\n",
        report.links_extracted, report.incomplete_links
    ));
    out.push_str(&format!(
        "Persisted: {} batches, {} records, {} new links, {} rows skipped\n",
        report.batches_persisted,
        report.persisted.records_persisted,
        report.persisted.links_created,
        report.persisted.rows_skipped
    ));

    if !report.fetch_failures.is_empty() {
        out.push_str(&format!("\nUnreachable ({}):\n", report.fetch_failures.len()));
        for url in &report.fetch_failures {
            out.push_str(&format!("  - {}\n", url));
        }
    }

    out
}
