//! Resilient outbound HTTP(S) transport.
//!
//! Replaces plain connection establishment for outbound requests. A dial
//! first resolves the hostname through the system resolver, falling back to
//! a fixed secondary nameserver when that fails or comes back empty.
//! Connection attempts go to a randomly chosen resolved address, with one
//! retry against a fresh random choice. Established connections get
//! OS-level TCP keepalive, or a fixed read/write deadline on platforms
//! where keepalive cannot be applied.

pub mod client;
pub mod config;
pub mod dns;
pub mod error;
pub mod net;

pub use client::{Client, ClientBuilder, ProxyEndpoint, ProxySelector};
pub use config::{ClientConfig, KeepaliveFailurePolicy};
pub use error::Error;
