//! Environment-driven proxy selection and CONNECT tunneling.
//!
//! # Responsibilities
//! - Read `HTTP_PROXY` / `HTTPS_PROXY` / `NO_PROXY` (and lowercase forms)
//! - Decide per target whether a proxy applies
//! - Establish a CONNECT tunnel over an already dialed proxy connection

use std::env;
use std::fmt;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::Error;
use crate::net::ConfiguredStream;

/// A proxy endpoint parsed from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyEndpoint {
    pub(crate) host: String,
    pub(crate) port: u16,
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl ProxyEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Accepts `http://proxy.example:3128`, `proxy.example:3128` and bare
    /// `proxy.example` forms.
    fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let url = if value.contains("://") {
            url::Url::parse(value).ok()?
        } else {
            url::Url::parse(&format!("http://{value}")).ok()?
        };
        let host = url.host_str()?.to_string();
        let port = url.port_or_known_default().unwrap_or(80);
        Some(Self { host, port })
    }
}

/// Proxy selection derived from the process environment.
///
/// Selection is by target scheme; `NO_PROXY` entries match exact hosts and
/// domain suffixes, and a bare `*` disables proxying entirely.
#[derive(Debug, Clone, Default)]
pub struct ProxySelector {
    http: Option<ProxyEndpoint>,
    https: Option<ProxyEndpoint>,
    no_proxy: Vec<String>,
    disabled: bool,
}

impl ProxySelector {
    /// Read proxy settings from the environment.
    pub fn from_env() -> Self {
        let http = env_var("HTTP_PROXY").as_deref().and_then(ProxyEndpoint::parse);
        let https = env_var("HTTPS_PROXY")
            .as_deref()
            .and_then(ProxyEndpoint::parse);

        let raw = env_var("NO_PROXY").unwrap_or_default();
        let disabled = raw.trim() == "*";
        let no_proxy = raw
            .split(',')
            .map(|entry| entry.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|entry| !entry.is_empty() && entry != "*")
            .collect();

        Self {
            http,
            https,
            no_proxy,
            disabled,
        }
    }

    /// A selector that never proxies, regardless of the environment.
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    /// A selector that routes every target through one proxy, regardless
    /// of the environment.
    pub fn fixed(endpoint: ProxyEndpoint) -> Self {
        Self {
            http: Some(endpoint.clone()),
            https: Some(endpoint),
            ..Self::default()
        }
    }

    pub(crate) fn proxy_for(&self, tls: bool, host: &str) -> Option<&ProxyEndpoint> {
        if self.disabled || self.is_excluded(host) {
            return None;
        }
        if tls {
            self.https.as_ref()
        } else {
            self.http.as_ref()
        }
    }

    fn is_excluded(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.no_proxy
            .iter()
            .any(|entry| host == *entry || host.ends_with(&format!(".{entry}")))
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .or_else(|| {
            env::var(name.to_ascii_lowercase())
                .ok()
                .filter(|value| !value.is_empty())
        })
}

/// Establish a CONNECT tunnel to `host:port` over a connected proxy stream.
///
/// The stream is positioned just past the proxy's response headers on
/// success, ready for the target's protocol.
pub(crate) async fn tunnel(
    stream: &mut ConfiguredStream,
    host: &str,
    port: u16,
) -> Result<(), Error> {
    let target = format!("{host}:{port}");
    let proxy_err = |reason: String| Error::ProxyConnect {
        target: target.clone(),
        reason,
    };

    let request = format!("CONNECT {target} HTTP/1.1\r\nHost: {target}\r\n\r\n");
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|err| proxy_err(err.to_string()))?;

    let mut response = [0u8; 1024];
    let mut filled = 0;
    loop {
        if filled == response.len() {
            return Err(proxy_err("response headers too large".to_string()));
        }
        let n = stream
            .read(&mut response[filled..])
            .await
            .map_err(|err| proxy_err(err.to_string()))?;
        if n == 0 {
            return Err(proxy_err("proxy closed the connection".to_string()));
        }
        filled += n;
        if response[..filled].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    let head = String::from_utf8_lossy(&response[..filled]);
    if head.starts_with("HTTP/1.1 200") || head.starts_with("HTTP/1.0 200") {
        Ok(())
    } else {
        let status = head.lines().next().unwrap_or("").to_string();
        Err(proxy_err(status))
    }
}
