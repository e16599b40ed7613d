//! Fallback resolver: a minimal DNS client pointed at one fixed nameserver.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use hickory_resolver::config::{
    LookupIpStrategy, NameServerConfig, Protocol, ResolverConfig, ResolverOpts,
};
use hickory_resolver::TokioAsyncResolver;

use super::{Resolve, ResolveError, Resolving};

/// Issues a single A-record query over UDP to the configured nameserver.
///
/// Queried only when the system path fails or yields nothing. Caching is
/// disabled so every dial re-resolves.
#[derive(Clone)]
pub struct FallbackResolver {
    resolver: TokioAsyncResolver,
    nameserver: SocketAddr,
}

impl FallbackResolver {
    pub fn new(nameserver: SocketAddr, timeout: Duration) -> Self {
        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig::new(nameserver, Protocol::Udp));

        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        opts.ip_strategy = LookupIpStrategy::Ipv4Only;
        opts.use_hosts_file = false;
        opts.cache_size = 0;

        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            nameserver,
        }
    }

    pub fn nameserver(&self) -> SocketAddr {
        self.nameserver
    }
}

impl fmt::Debug for FallbackResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackResolver")
            .field("nameserver", &self.nameserver)
            .finish_non_exhaustive()
    }
}

impl Resolve for FallbackResolver {
    fn resolve(&self, host: &str) -> Resolving {
        let resolver = self.resolver.clone();
        let host = host.to_string();
        Box::pin(async move {
            let lookup = resolver
                .ipv4_lookup(host.clone())
                .await
                .map_err(|source| ResolveError::Fallback {
                    host: host.clone(),
                    source,
                })?;
            Ok(lookup.iter().map(|a| IpAddr::V4(a.0)).collect())
        })
    }
}
