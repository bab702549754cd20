//! Per-batch grouping of resolved links
//!
//! A batch of `(source url, HostingInfo)` observations is folded into one
//! record per (domain, ip) pair holding the number of observations and the
//! distinct source URLs that produced them. Incomplete triples are dropped
//! here, so the sum of all counts always equals the number of complete
//! observations fed in.

use crate::crawler::resolver::HostingInfo;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Grouping key: a (domain, ip) pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AggregateKey {
    pub domain: String,
    pub ip: String,
}

impl fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.domain, self.ip)
    }
}

/// Observations of one key within a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateRecord {
    /// Number of complete observations (always >= 1 once inserted)
    pub count: u64,

    /// Seed URLs whose pages linked to this key
    pub urls: BTreeSet<String>,
}

/// Aggregated batch, ordered by key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateBatch {
    records: BTreeMap<AggregateKey, AggregateRecord>,
}

impl AggregateBatch {
    /// Number of distinct (domain, ip) keys
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of counts across all records
    pub fn total_count(&self) -> u64 {
        self.records.values().map(|record| record.count).sum()
    }

    pub fn get(&self, domain: &str, ip: &str) -> Option<&AggregateRecord> {
        self.records.get(&AggregateKey {
            domain: domain.to_string(),
            ip: ip.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AggregateKey, &AggregateRecord)> {
        self.records.iter()
    }

    /// Distinct source URLs across all records, in order
    pub fn source_urls(&self) -> BTreeSet<&str> {
        self.records
            .values()
            .flat_map(|record| record.urls.iter().map(String::as_str))
            .collect()
    }

    /// Adds one observation; incomplete triples are ignored
    ///
    /// Returns true if the observation was counted.
    pub fn observe(&mut self, source_url: &str, info: &HostingInfo) -> bool {
        if !info.is_complete() {
            return false;
        }

        let record = self
            .records
            .entry(AggregateKey {
                domain: info.domain().to_string(),
                ip: info.ip().to_string(),
            })
            .or_default();
        record.count += 1;
        record.urls.insert(source_url.to_string());
        true
    }
}

/// Groups a batch of observations by (domain, ip)
///
/// The result depends only on the multiset of inputs, never their order.
pub fn aggregate<'a, I>(batch: I) -> AggregateBatch
where
    I: IntoIterator<Item = &'a (String, HostingInfo)>,
{
    let mut aggregated = AggregateBatch::default();
    for (source_url, info) in batch {
        aggregated.observe(source_url, info);
    }
    aggregated
}
