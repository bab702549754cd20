//! Crawler module: the fetch → extract → resolve → aggregate pipeline
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with bounded retry
//! - HTML link extraction behind a swappable trait
//! - Host resolution of extracted links
//! - Per-batch aggregation by (domain, ip)
//! - Overall pipeline coordination

mod aggregator;
mod coordinator;
mod extractor;
mod fetcher;
mod resolver;
mod retry;

pub use aggregator::{aggregate, AggregateBatch, AggregateKey, AggregateRecord};
pub use coordinator::{run_crawl, CrawlReport, Pipeline};
pub use extractor::{
    extractor_for, FragmentLinkExtractor, HtmlLinkExtractor, LinkExtractor, Links,
};
pub use fetcher::{build_http_client, FetchResult, Fetcher};
pub use resolver::{
    ip_of, resolve, CachingResolver, DnsResolver, HostResolver, HostingInfo, StaticResolver,
};
pub use retry::{retry, RetryOutcome};
