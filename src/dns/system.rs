//! Primary resolver backed by the host's standard resolution mechanism.

use std::net::IpAddr;

use tokio::net::lookup_host;

use super::{Resolve, ResolveError, Resolving};

/// Resolves through getaddrinfo on the runtime's blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

impl Resolve for SystemResolver {
    fn resolve(&self, host: &str) -> Resolving {
        let host = host.to_string();
        Box::pin(async move {
            // lookup_host wants a port; it is dropped from the results.
            let addrs: Vec<IpAddr> = lookup_host((host.as_str(), 0u16))
                .await
                .map_err(|source| ResolveError::System {
                    host: host.clone(),
                    source,
                })?
                .map(|addr| addr.ip())
                .collect();
            Ok(addrs)
        })
    }
}
