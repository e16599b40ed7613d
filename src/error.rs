//! Crate-level error type.
//!
//! Every failure here is scoped to a single request's dial or exchange;
//! nothing is fatal to the process. Timeouts at a sub-step surface as that
//! sub-step's failure rather than as a distinct kind.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::dns::ResolveError;
use crate::net::{ConnectError, KeepaliveError};

/// Errors surfaced by [`Client`](crate::Client) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration failed validation.
    #[error("invalid configuration")]
    Config(#[from] ConfigError),

    /// Neither the primary nor the fallback resolver produced addresses.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// All connection attempts failed.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Keepalive configuration failed and the policy is to fail the dial.
    #[error(transparent)]
    Keepalive(#[from] KeepaliveError),

    /// TLS handshake with the target failed or timed out.
    #[error("TLS handshake with {host} failed")]
    Handshake {
        host: String,
        #[source]
        source: io::Error,
    },

    /// The proxy refused or broke the CONNECT tunnel.
    #[error("proxy CONNECT to {target} failed: {reason}")]
    ProxyConnect { target: String, reason: String },

    /// The request target was not a dialable URI.
    #[error("invalid request target: {0}")]
    Target(String),

    /// Building a request failed.
    #[error(transparent)]
    Http(#[from] http::Error),

    /// Encoding a form body failed.
    #[error("failed to encode form body")]
    FormEncode(#[source] serde_urlencoded::ser::Error),

    /// The HTTP engine failed to exchange the request. Dial failures raised
    /// inside the engine's connection setup are in the source chain.
    #[error("request failed")]
    Engine(#[source] hyper_util::client::legacy::Error),
}
