//! Connection resolver
//!
//! Rewrites the descriptor's hostname to an IPv4 address so the driver never
//! attempts an IPv6 route on dual-stack hosts where that route is broken.
//! Resolution is best effort: any failure yields the original descriptor.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;

use crate::descriptor::{ConnectionDescriptor, DescriptorError};

/// Default bound on a single lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Hostname to IPv4 lookup.
#[async_trait]
pub trait HostLookup: Send + Sync {
    /// Resolve `host` to an IPv4 address. `Ok(None)` means the name exists
    /// but has no A record.
    async fn lookup_ipv4(&self, host: &str) -> io::Result<Option<Ipv4Addr>>;
}

/// Lookup through the system resolver (`getaddrinfo` via tokio).
#[derive(Debug, Clone)]
pub struct SystemLookup {
    timeout: Duration,
}

impl SystemLookup {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemLookup {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKUP_TIMEOUT)
    }
}

#[async_trait]
impl HostLookup for SystemLookup {
    async fn lookup_ipv4(&self, host: &str) -> io::Result<Option<Ipv4Addr>> {
        let addrs = tokio::time::timeout(self.timeout, tokio::net::lookup_host((host, 0)))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "DNS lookup timed out"))??;

        Ok(addrs.into_iter().find_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        }))
    }
}

/// Turns a descriptor into a connectable target, preferring IPv4.
#[derive(Debug, Clone)]
pub struct ConnectionResolver<L = SystemLookup> {
    lookup: Option<L>,
}

impl ConnectionResolver<SystemLookup> {
    /// Resolver backed by the system DNS resolver.
    pub fn system() -> Self {
        Self::new(SystemLookup::default())
    }
}

impl<L: HostLookup> ConnectionResolver<L> {
    pub fn new(lookup: L) -> Self {
        Self {
            lookup: Some(lookup),
        }
    }

    /// Pass-through resolver: descriptors are returned untouched.
    pub fn disabled() -> Self {
        Self { lookup: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.lookup.is_some()
    }

    /// Resolve the descriptor's host to IPv4, falling back to the original.
    ///
    /// Each call performs its own lookup; nothing is cached.
    pub async fn resolve(&self, descriptor: &ConnectionDescriptor) -> ConnectionDescriptor {
        let Some(lookup) = &self.lookup else {
            return descriptor.clone();
        };

        if descriptor.host_is_ip() {
            tracing::debug!(host = descriptor.host(), "host is an IP literal, skipping lookup");
            return descriptor.clone();
        }

        let host = descriptor.host();
        match lookup.lookup_ipv4(host).await {
            Ok(Some(ip)) => {
                let resolved = descriptor.with_host(IpAddr::V4(ip));
                tracing::info!(host, address = %ip, url = %resolved, "resolved database host to IPv4");
                resolved
            }
            Ok(None) => {
                tracing::warn!(host, "no IPv4 address for database host, using hostname");
                descriptor.clone()
            }
            Err(e) => {
                tracing::warn!(host, error = %e, "failed to resolve database host, using hostname");
                descriptor.clone()
            }
        }
    }

    /// Parse and resolve in one step. Only malformed input is an error.
    pub async fn resolve_str(&self, input: &str) -> Result<ConnectionDescriptor, DescriptorError> {
        let descriptor = ConnectionDescriptor::parse(input)?;
        Ok(self.resolve(&descriptor).await)
    }
}
