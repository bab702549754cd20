//! Statistics generation from the hosting database
//!
//! This module provides functionality for extracting and displaying
//! aggregate statistics from the storage layer.

use crate::storage::{DomainIpRecord, Storage, StorageError};

/// Number of (domain, ip) pairs listed in the report
pub const TOP_LIMIT: usize = 10;

/// Store-wide statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostStatistics {
    /// Number of crawled URLs on record
    pub urls: u64,

    /// Number of distinct (domain, ip) pairs
    pub domain_ips: u64,

    /// Number of URL ↔ pair links
    pub links: u64,

    /// Sum of all pair counters
    pub total_observations: u64,

    /// Most frequently observed pairs
    pub top: Vec<DomainIpRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(HostStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<HostStatistics, StorageError> {
    Ok(HostStatistics {
        urls: storage.count_urls()?,
        domain_ips: storage.count_domain_ips()?,
        links: storage.count_links()?,
        total_observations: storage.total_counter()?,
        top: storage.top_domain_ips(TOP_LIMIT)?,
    })
}

/// Renders statistics as the text printed by `--stats`
pub fn format_statistics(stats: &HostStatistics) -> String {
    let mut out = String::new();

    out.push_str("=== Hosting Statistics ===\n\n");
    out.push_str("Overview:\n");
    out.push_str(&format!("  URLs crawled: {}\n", stats.urls));
    out.push_str(&format!("  (domain, ip) pairs: {}\n", stats.domain_ips));
    out.push_str(&format!("  Links: {}\n", stats.links));
    out.push_str(&format!("  Total observations: {}\n", stats.total_observations));

    if !stats.top.is_empty() {
        out.push_str(&format!("\nTop {} pairs:\n", stats.top.len()));
        for record in &stats.top {
            let share = if stats.total_observations > 0 {
                (record.counter as f64 / stats.total_observations as f64) * 100.0
            } else {
                0.0
            };
            out.push_str(&format!(
                "  {:<40} {:<15} {:>8} ({:.1}%)\n",
                record.domain, record.ip, record.counter, share
            ));
        }
    }

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &HostStatistics) {
    print!("{}", format_statistics(stats));
}
