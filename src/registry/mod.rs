//! Container registry host resolution
//!
//! Resolves the configured `host[:port]` registry address into the prefix
//! used for image tags. IPv4 literals are used verbatim; hostnames go
//! through a single forward DNS lookup whose result is cached until an
//! explicit [`ContainerHostResolver::clear`]. A failed lookup degrades to
//! the unresolved configured value rather than failing the build.

use std::io;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;

static IPV4_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])\.){3}([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])$",
    )
    .unwrap()
});

/// Port assumed when the configured host carries no explicit port.
pub const DEFAULT_REGISTRY_PORT: &str = "80";

/// Forward DNS lookup capability, injectable for tests.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// Resolves a hostname to a single address.
    async fn lookup(&self, host: &str) -> io::Result<IpAddr>;
}

/// DNS lookup backed by the tokio resolver.
#[derive(Debug, Clone, Default)]
pub struct TokioDns;

#[async_trait]
impl DnsLookup for TokioDns {
    async fn lookup(&self, host: &str) -> io::Result<IpAddr> {
        let mut addrs = tokio::net::lookup_host((host, 0)).await?;
        addrs.next().map(|addr| addr.ip()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses found for {host}"),
            )
        })
    }
}

/// Resolver for the container registry host prefix.
///
/// Owns the configured host string and the cached resolution; threading one
/// instance through the pipeline replaces the hidden process-global the
/// resolution would otherwise live in, which keeps tests and multi-instance
/// operation honest.
pub struct ContainerHostResolver {
    configured: Option<String>,
    lookup: Arc<dyn DnsLookup>,
    cached: Mutex<Option<String>>,
}

impl ContainerHostResolver {
    /// Creates a resolver for the configured `host[:port]` value, if any.
    #[must_use]
    pub fn new(configured: Option<String>) -> Self {
        Self::with_lookup(configured, Arc::new(TokioDns))
    }

    /// Creates a resolver with a custom DNS lookup implementation.
    #[must_use]
    pub fn with_lookup(configured: Option<String>, lookup: Arc<dyn DnsLookup>) -> Self {
        Self {
            configured,
            lookup,
            cached: Mutex::new(None),
        }
    }

    /// Returns the registry host prefix for image tags.
    ///
    /// Returns `""` when no host is configured (tags then carry no host
    /// prefix), otherwise `"<host>:<port>/"`. The first resolution is cached;
    /// subsequent calls perform no further lookups until [`Self::clear`].
    pub async fn container_host(&self) -> String {
        if let Some(cached) = self.cached.lock().clone() {
            return cached;
        }

        let Some(configured) = &self.configured else {
            return String::new();
        };

        let (host, port) = match configured.split_once(':') {
            Some((host, port)) => (host, port),
            None => (configured.as_str(), DEFAULT_REGISTRY_PORT),
        };

        let resolved = if IPV4_PATTERN.is_match(host) {
            format!("{host}:{port}/")
        } else {
            match self.lookup.lookup(host).await {
                Ok(address) => format!("{address}:{port}/"),
                Err(err) => {
                    tracing::warn!(error = %err, host, "Failed to find DNS resolution of container host.");
                    format!("{configured}/")
                }
            }
        };

        *self.cached.lock() = Some(resolved.clone());
        resolved
    }

    /// Drops the cached resolution, forcing the next call to resolve again.
    pub fn clear(&self) {
        *self.cached.lock() = None;
    }
}
