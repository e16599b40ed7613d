//! Dial pipeline plugged into the HTTP engine as a connector service.
//!
//! # Data Flow
//! ```text
//! hyper needs a connection for a Uri
//!     → target derivation (scheme, host, port)
//!     → proxy selection (environment-derived)
//!     → dns (resolve host or proxy host)
//!     → net (random-address connect, keepalive configuration)
//!     → optional CONNECT tunnel, optional TLS handshake
//!     → TransportStream handed back to hyper
//! ```

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use http::uri::{Scheme, Uri};
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::config::ClientConfig;
use crate::dns::HostResolver;
use crate::error::Error;
use crate::net::{ConfiguredStream, Establisher, KeepaliveConfigurer};

use super::proxy::{self, ProxySelector};

/// One dial target derived from a request URI.
#[derive(Debug, Clone)]
struct Target {
    tls: bool,
    host: String,
    port: u16,
}

fn target_of(uri: &Uri) -> Result<Target, Error> {
    let scheme = uri
        .scheme()
        .ok_or_else(|| Error::Target(format!("{uri} has no scheme")))?;
    let tls = if *scheme == Scheme::HTTPS {
        true
    } else if *scheme == Scheme::HTTP {
        false
    } else {
        return Err(Error::Target(format!("unsupported scheme {scheme}")));
    };

    let host = uri
        .host()
        .ok_or_else(|| Error::Target(format!("{uri} has no host")))?;
    // Brackets around IPv6 literals are not part of the address.
    let host = host.trim_start_matches('[').trim_end_matches(']').to_string();
    let port = uri.port_u16().unwrap_or(if tls { 443 } else { 80 });

    Ok(Target { tls, host, port })
}

/// Byte stream handed to the HTTP engine: a configured TCP connection,
/// optionally wrapped in TLS.
#[derive(Debug)]
pub enum TransportStream {
    Plain(ConfiguredStream),
    Tls(Box<TlsStream<ConfiguredStream>>),
}

impl AsyncRead for TransportStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(inner) => Pin::new(inner).poll_read(cx, buf),
            Self::Tls(inner) => Pin::new(inner).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for TransportStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(inner) => Pin::new(inner).poll_write(cx, buf),
            Self::Tls(inner) => Pin::new(inner).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(inner) => Pin::new(inner).poll_flush(cx),
            Self::Tls(inner) => Pin::new(inner).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(inner) => Pin::new(inner).poll_shutdown(cx),
            Self::Tls(inner) => Pin::new(inner).poll_shutdown(cx),
        }
    }
}

impl Connection for TransportStream {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}

/// Connector implementing the resolve, select, connect and configure
/// pipeline for the HTTP engine.
///
/// Cloning is cheap; every part is shared. Each call dials independently
/// with no coordination across in-flight requests.
#[derive(Clone)]
pub struct Connector {
    config: Arc<ClientConfig>,
    resolver: Arc<HostResolver>,
    establisher: Arc<Establisher>,
    keepalive: Arc<KeepaliveConfigurer>,
    tls: TlsConnector,
    proxies: Arc<ProxySelector>,
}

impl Connector {
    pub(crate) fn new(
        config: Arc<ClientConfig>,
        resolver: HostResolver,
        establisher: Establisher,
        keepalive: KeepaliveConfigurer,
        proxies: ProxySelector,
    ) -> Self {
        Self {
            config,
            resolver: Arc::new(resolver),
            establisher: Arc::new(establisher),
            keepalive: Arc::new(keepalive),
            tls: TlsConnector::from(tls_config()),
            proxies: Arc::new(proxies),
        }
    }

    async fn dial(self, uri: Uri) -> Result<TokioIo<TransportStream>, Error> {
        let target = target_of(&uri)?;
        let via_proxy = self.proxies.proxy_for(target.tls, &target.host).cloned();

        // The proxy endpoint, when one applies, goes through the same
        // resolve / connect / configure pipeline as a direct target.
        let (dial_host, dial_port) = match &via_proxy {
            Some(endpoint) => (endpoint.host.clone(), endpoint.port),
            None => (target.host.clone(), target.port),
        };

        let addrs = self.resolver.resolve(&dial_host).await?;
        let stream = self
            .establisher
            .connect(&dial_host, &addrs, dial_port)
            .await?;
        let mut stream = self.keepalive.apply(stream)?;

        if let Some(endpoint) = &via_proxy {
            tracing::debug!(proxy = %endpoint, host = %target.host, port = target.port, "establishing CONNECT tunnel");
            proxy::tunnel(&mut stream, &target.host, target.port).await?;
        }

        if !target.tls {
            return Ok(TokioIo::new(TransportStream::Plain(stream)));
        }

        let server_name = ServerName::try_from(target.host.clone())
            .map_err(|_| Error::Target(format!("{} is not a valid TLS server name", target.host)))?;
        let handshake = self.tls.connect(server_name, stream);
        let tls_stream =
            match tokio::time::timeout(self.config.handshake_timeout(), handshake).await {
                Ok(Ok(stream)) => stream,
                Ok(Err(source)) => {
                    return Err(Error::Handshake {
                        host: target.host,
                        source,
                    })
                }
                Err(_) => {
                    return Err(Error::Handshake {
                        host: target.host,
                        source: io::Error::new(io::ErrorKind::TimedOut, "TLS handshake timed out"),
                    })
                }
            };
        tracing::debug!(host = %target.host, "TLS handshake complete");
        Ok(TokioIo::new(TransportStream::Tls(Box::new(tls_stream))))
    }
}

impl tower::Service<Uri> for Connector {
    type Response = TokioIo<TransportStream>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        Box::pin(self.clone().dial(uri))
    }
}

fn tls_config() -> Arc<rustls::ClientConfig> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let mut config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Arc::new(config)
}
