//! TCP keepalive configuration with deadline fallback.
//!
//! # Responsibilities
//! - Enable OS-level keepalive on freshly established connections
//! - Substitute a fixed read/write deadline where keepalive is unsupported
//! - Apply the configured policy when enabling keepalive fails
//!
//! # Design Decisions
//! - Support is decided by an injected predicate so behavior is testable
//!   on any host, instead of a compile-time platform switch
//! - Configuration is one-shot with no retries; it is a fast local
//!   operation with no external I/O

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

use crate::config::{ClientConfig, KeepaliveFailurePolicy};

use super::DeadlineStream;

/// Capability check deciding whether OS-level keepalive is attempted.
pub type KeepaliveSupport = Arc<dyn Fn() -> bool + Send + Sync>;

/// Keepalive probe parameters applied to each established connection.
#[derive(Debug, Clone, Copy)]
pub struct KeepaliveParams {
    /// Idle time before the first probe.
    pub idle: Duration,
    /// Interval between probes.
    pub interval: Duration,
    /// Unanswered probes before the peer is considered dead.
    pub probe_count: u32,
}

impl KeepaliveParams {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            idle: config.keepalive_idle(),
            interval: config.keepalive_interval(),
            probe_count: config.keepalive_probe_count,
        }
    }

    fn to_tcp_keepalive(self) -> TcpKeepalive {
        let keepalive = TcpKeepalive::new().with_time(self.idle);
        #[cfg(not(windows))]
        let keepalive = keepalive
            .with_interval(self.interval)
            .with_retries(self.probe_count);
        keepalive
    }
}

/// Errors from [`KeepaliveConfigurer::apply`].
#[derive(Debug, Error)]
pub enum KeepaliveError {
    /// Enabling keepalive failed and the policy is to fail the dial. The
    /// connection has been closed.
    #[error("enabling TCP keepalive failed")]
    Apply(#[source] io::Error),
}

/// Applies keepalive to fresh connections, or degrades to a fixed
/// read/write deadline where keepalive is unavailable.
#[derive(Clone)]
pub struct KeepaliveConfigurer {
    params: KeepaliveParams,
    read_write_timeout: Duration,
    policy: KeepaliveFailurePolicy,
    supported: KeepaliveSupport,
}

impl fmt::Debug for KeepaliveConfigurer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeepaliveConfigurer")
            .field("params", &self.params)
            .field("read_write_timeout", &self.read_write_timeout)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl KeepaliveConfigurer {
    pub fn new(
        params: KeepaliveParams,
        read_write_timeout: Duration,
        policy: KeepaliveFailurePolicy,
    ) -> Self {
        Self {
            params,
            read_write_timeout,
            policy,
            supported: Arc::new(default_support),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            KeepaliveParams::from_config(config),
            config.read_write_timeout(),
            config.on_keepalive_failure,
        )
    }

    /// Replace the capability check.
    pub fn with_support(mut self, supported: KeepaliveSupport) -> Self {
        self.supported = supported;
        self
    }

    /// Configure `stream` for long-lived use.
    ///
    /// One-shot: the outcome is either a keepalive-enabled stream, a
    /// deadline-wrapped stream, or a failed dial per the configured policy.
    pub fn apply(&self, stream: TcpStream) -> Result<ConfiguredStream, KeepaliveError> {
        if !(self.supported)() {
            tracing::debug!("keepalive unsupported here, applying read/write deadline");
            return Ok(ConfiguredStream::Deadline {
                inner: DeadlineStream::new(stream, self.read_write_timeout),
            });
        }

        match SockRef::from(&stream).set_tcp_keepalive(&self.params.to_tcp_keepalive()) {
            Ok(()) => {
                tracing::trace!(
                    idle = ?self.params.idle,
                    interval = ?self.params.interval,
                    probes = self.params.probe_count,
                    "keepalive enabled"
                );
                Ok(ConfiguredStream::Keepalive { inner: stream })
            }
            Err(source) => match self.policy {
                KeepaliveFailurePolicy::FailDial => {
                    // Dropping the stream closes it; no partially configured
                    // connection escapes.
                    Err(KeepaliveError::Apply(source))
                }
                KeepaliveFailurePolicy::DegradeToDeadline => {
                    tracing::warn!(
                        error = %source,
                        "keepalive failed, degrading to read/write deadline"
                    );
                    Ok(ConfiguredStream::Deadline {
                        inner: DeadlineStream::new(stream, self.read_write_timeout),
                    })
                }
            },
        }
    }
}

fn default_support() -> bool {
    // The one platform family where per-connection keepalive tuning is
    // assumed unavailable.
    !cfg!(windows)
}

/// An established connection after keepalive configuration.
///
/// The variant is the configuration outcome: either OS keepalive is active,
/// or the stream carries a fixed read/write deadline instead.
#[derive(Debug)]
pub enum ConfiguredStream {
    Keepalive { inner: TcpStream },
    Deadline { inner: DeadlineStream<TcpStream> },
}

impl ConfiguredStream {
    /// Whether OS-level keepalive was applied.
    pub fn keepalive_applied(&self) -> bool {
        matches!(self, Self::Keepalive { .. })
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.tcp().peer_addr()
    }

    fn tcp(&self) -> &TcpStream {
        match self {
            Self::Keepalive { inner } => inner,
            Self::Deadline { inner } => inner.get_ref(),
        }
    }
}

impl AsyncRead for ConfiguredStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Keepalive { inner } => Pin::new(inner).poll_read(cx, buf),
            Self::Deadline { inner } => Pin::new(inner).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ConfiguredStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Keepalive { inner } => Pin::new(inner).poll_write(cx, buf),
            Self::Deadline { inner } => Pin::new(inner).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Keepalive { inner } => Pin::new(inner).poll_flush(cx),
            Self::Deadline { inner } => Pin::new(inner).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Keepalive { inner } => Pin::new(inner).poll_shutdown(cx),
            Self::Deadline { inner } => Pin::new(inner).poll_shutdown(cx),
        }
    }
}
