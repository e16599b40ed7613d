//! Connection establishment with randomized address selection.
//!
//! # Responsibilities
//! - Pick one address per attempt, uniformly at random
//! - Bound each attempt by the connect timeout
//! - Surface the last attempt's error when every attempt fails

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;

/// Connection attempts per dial.
const DIAL_ATTEMPTS: u32 = 2;

/// Chooses which of the resolved addresses to dial.
///
/// Selection is independent per attempt, so the same address may be chosen
/// twice. Tests inject sequenced pickers to make retry behavior exact.
pub trait AddressPicker: Send + Sync + fmt::Debug {
    /// Return an index in `0..len`. `len` is never zero.
    fn pick(&self, len: usize) -> usize;
}

/// Uniform random selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPicker;

impl AddressPicker for RandomPicker {
    fn pick(&self, len: usize) -> usize {
        fastrand::usize(..len)
    }
}

/// Errors from [`Establisher::connect`].
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The resolved address set was empty; no socket was opened.
    #[error("host {host:?} is unreachable: no resolved addresses")]
    NoAddresses { host: String },

    /// The last connection attempt failed. Timeouts surface here as
    /// [`io::ErrorKind::TimedOut`].
    #[error("connecting to {addr} failed")]
    Io {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Opens TCP connections to one of a set of candidate addresses.
#[derive(Debug, Clone)]
pub struct Establisher {
    picker: Arc<dyn AddressPicker>,
    connect_timeout: Duration,
}

impl Establisher {
    pub fn new(picker: Arc<dyn AddressPicker>, connect_timeout: Duration) -> Self {
        Self {
            picker,
            connect_timeout,
        }
    }

    /// Open a connection to `host` on `port` via one of `addrs`.
    ///
    /// Performs up to two attempts, each against an independently chosen
    /// random address, and returns on the first success. An empty `addrs`
    /// fails immediately without any socket operation.
    pub async fn connect(
        &self,
        host: &str,
        addrs: &[IpAddr],
        port: u16,
    ) -> Result<TcpStream, ConnectError> {
        if addrs.is_empty() {
            return Err(ConnectError::NoAddresses {
                host: host.to_string(),
            });
        }

        let mut last_err: Option<ConnectError> = None;
        for attempt in 1..=DIAL_ATTEMPTS {
            let addr = SocketAddr::new(addrs[self.picker.pick(addrs.len())], port);
            tracing::debug!(host = %host, %addr, attempt, "connecting");
            match tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    tracing::debug!(host = %host, %addr, attempt, "connected");
                    return Ok(stream);
                }
                Ok(Err(source)) => {
                    tracing::debug!(host = %host, %addr, attempt, error = %source, "connect failed");
                    last_err = Some(ConnectError::Io { addr, source });
                }
                Err(_) => {
                    tracing::debug!(host = %host, %addr, attempt, "connect timed out");
                    last_err = Some(ConnectError::Io {
                        addr,
                        source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                    });
                }
            }
        }

        // The loop ran at least once, so an error was recorded.
        Err(last_err.unwrap_or(ConnectError::NoAddresses {
            host: host.to_string(),
        }))
    }
}
