//! Hostname resolution subsystem.
//!
//! # Data Flow
//! ```text
//! dial needs addresses for host
//!     → system.rs (getaddrinfo via the runtime's blocking pool)
//!     → on error / timeout / empty result:
//!       fallback.rs (single A query to the fixed fallback nameserver)
//!     → Vec<IpAddr> handed to the connection establisher
//! ```
//!
//! # Design Decisions
//! - No caching: every dial re-resolves, trading latency for freshness
//! - Both stages are injectable trait objects so tests can count queries
//! - Each stage is bounded by the same resolve timeout

pub mod fallback;
pub mod system;

pub use fallback::FallbackResolver;
pub use system::SystemResolver;

use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Boxed future returned by [`Resolve::resolve`].
pub type Resolving = Pin<Box<dyn Future<Output = Result<Vec<IpAddr>, ResolveError>> + Send>>;

/// A hostname-to-addresses lookup.
pub trait Resolve: Send + Sync + fmt::Debug {
    fn resolve(&self, host: &str) -> Resolving;
}

/// Why a hostname could not be turned into addresses.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The system resolution mechanism failed.
    #[error("system resolution for {host:?} failed")]
    System {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// The fallback nameserver query failed.
    #[error("fallback resolution for {host:?} failed")]
    Fallback {
        host: String,
        #[source]
        source: hickory_resolver::error::ResolveError,
    },

    /// A resolution stage exceeded the resolve timeout.
    #[error("resolution of {host:?} timed out")]
    Timeout { host: String },

    /// Both stages completed but produced zero usable addresses.
    #[error("no addresses found for {host:?}")]
    NoAddresses { host: String },
}

/// Two-stage resolver: system mechanism first, fixed fallback nameserver
/// second.
///
/// The fallback is queried only when the primary path errors, times out, or
/// returns zero addresses. One successful primary lookup never touches the
/// fallback.
#[derive(Debug, Clone)]
pub struct HostResolver {
    primary: Arc<dyn Resolve>,
    fallback: Arc<dyn Resolve>,
    timeout: Duration,
}

impl HostResolver {
    pub fn new(primary: Arc<dyn Resolve>, fallback: Arc<dyn Resolve>, timeout: Duration) -> Self {
        Self {
            primary,
            fallback,
            timeout,
        }
    }

    /// Resolve `host` into an unordered set of IP addresses.
    ///
    /// Hosts that already parse as IP literals are returned without any
    /// network round-trip.
    pub async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ResolveError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        match tokio::time::timeout(self.timeout, self.primary.resolve(host)).await {
            Ok(Ok(addrs)) if !addrs.is_empty() => {
                tracing::debug!(host = %host, count = addrs.len(), "resolved via primary");
                return Ok(addrs);
            }
            Ok(Ok(_)) => {
                tracing::debug!(host = %host, "primary resolver returned no addresses");
            }
            Ok(Err(error)) => {
                tracing::debug!(host = %host, error = %error, "primary resolver failed");
            }
            Err(_) => {
                tracing::debug!(host = %host, "primary resolver timed out");
            }
        }

        tracing::warn!(host = %host, "falling back to secondary nameserver");
        let addrs = match tokio::time::timeout(self.timeout, self.fallback.resolve(host)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ResolveError::Timeout {
                    host: host.to_string(),
                })
            }
        };
        if addrs.is_empty() {
            return Err(ResolveError::NoAddresses {
                host: host.to_string(),
            });
        }
        tracing::debug!(host = %host, count = addrs.len(), "resolved via fallback");
        Ok(addrs)
    }
}
