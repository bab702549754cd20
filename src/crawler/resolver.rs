//! Host resolution for extracted links
//!
//! A link becomes a [`HostingInfo`] triple: the raw link, its normalized
//! domain, and the IPv4 address that domain resolves to. Resolution failures
//! are absorbed here and surface as an empty IP, which marks the triple as
//! incomplete so it never reaches aggregation.

use crate::url::domain_of;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Resolved (link, domain, ip) triple
///
/// The domain is always derived from the link with [`domain_of`] when the
/// triple is built and cannot be changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostingInfo {
    link: String,
    domain: String,
    ip: String,
}

impl HostingInfo {
    /// Builds a triple for `link`, deriving the domain from it
    pub fn new(link: impl Into<String>, ip: impl Into<String>) -> Self {
        let link = link.into();
        let domain = domain_of(&link);
        Self {
            link,
            domain,
            ip: ip.into(),
        }
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Dotted-quad address, empty if resolution failed
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// Returns true if both domain and ip are present
    pub fn is_complete(&self) -> bool {
        !self.domain.is_empty() && !self.ip.is_empty()
    }
}

/// Forward name resolution
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Resolves `domain` to an IPv4 address, or `None` on any failure
    async fn lookup(&self, domain: &str) -> Option<Ipv4Addr>;
}

/// Resolver backed by the platform's name service
///
/// Each lookup is bounded by a timeout; a lookup that stalls counts as a
/// failure.
#[derive(Debug, Clone, Copy)]
pub struct DnsResolver {
    timeout: Duration,
}

impl DnsResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for DnsResolver {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl HostResolver for DnsResolver {
    async fn lookup(&self, domain: &str) -> Option<Ipv4Addr> {
        // The port is irrelevant to the lookup but required by the API
        bounded_lookup(domain, self.timeout, tokio::net::lookup_host((domain, 0))).await
    }
}

/// Awaits a name lookup for at most `limit` and picks its first usable IPv4
async fn bounded_lookup<F, I>(domain: &str, limit: Duration, lookup: F) -> Option<Ipv4Addr>
where
    F: Future<Output = io::Result<I>>,
    I: Iterator<Item = SocketAddr>,
{
    let addrs = match tokio::time::timeout(limit, lookup).await {
        Ok(Ok(addrs)) => addrs,
        Ok(Err(e)) => {
            tracing::debug!("Can't resolve {}: {}", domain, e);
            return None;
        }
        Err(_) => {
            tracing::debug!("Lookup of {} timed out after {:?}", domain, limit);
            return None;
        }
    };

    let ip = addrs
        .filter_map(|addr| match addr.ip() {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .find(|v4| !v4.is_unspecified());

    if ip.is_none() {
        tracing::debug!("No usable IPv4 address for {}", domain);
    }
    ip
}

/// Resolver answering from a fixed table
///
/// Domains missing from the table fail to resolve. Handy for tests and
/// offline runs.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    table: HashMap<String, Ipv4Addr>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a domain → address entry
    pub fn with(mut self, domain: impl Into<String>, ip: Ipv4Addr) -> Self {
        self.table.insert(domain.into(), ip);
        self
    }
}

#[async_trait]
impl HostResolver for StaticResolver {
    async fn lookup(&self, domain: &str) -> Option<Ipv4Addr> {
        self.table.get(domain).copied()
    }
}

/// Memoizes another resolver's answers, failures included
pub struct CachingResolver {
    inner: Arc<dyn HostResolver>,
    cache: Mutex<HashMap<String, Option<Ipv4Addr>>>,
}

impl CachingResolver {
    pub fn new(inner: Arc<dyn HostResolver>) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, domain: &str) -> Option<Option<Ipv4Addr>> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(domain).copied())
    }
}

#[async_trait]
impl HostResolver for CachingResolver {
    async fn lookup(&self, domain: &str) -> Option<Ipv4Addr> {
        if let Some(answer) = self.cached(domain) {
            return answer;
        }

        let answer = self.inner.lookup(domain).await;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(domain.to_string(), answer);
        }
        answer
    }
}

/// Resolves a domain to a dotted-quad string, empty on failure
///
/// An empty domain is never looked up.
pub async fn ip_of(resolver: &dyn HostResolver, domain: &str) -> String {
    if domain.is_empty() {
        return String::new();
    }

    resolver
        .lookup(domain)
        .await
        .map(|ip| ip.to_string())
        .unwrap_or_default()
}

/// Resolves a link into its hosting triple
pub async fn resolve(resolver: &dyn HostResolver, link: &str) -> HostingInfo {
    let domain = domain_of(link);
    let ip = ip_of(resolver, &domain).await;

    HostingInfo {
        link: link.to_string(),
        domain,
        ip,
    }
}
