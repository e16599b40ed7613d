//! Configuration schema definitions.
//!
//! All types derive Serde traits so a client can be configured straight
//! from a config file as well as from code.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeouts and keepalive parameters for the transport.
///
/// Created once at client construction and never mutated afterward; shared
/// read-only across arbitrarily many concurrent requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Hostname resolution timeout in milliseconds, applied separately to
    /// the primary and the fallback attempt.
    pub resolve_timeout_ms: u64,

    /// TCP connection timeout in milliseconds, per attempt.
    pub connect_timeout_ms: u64,

    /// TLS handshake timeout in milliseconds.
    pub handshake_timeout_ms: u64,

    /// Absolute read/write deadline in milliseconds, applied to connections
    /// that end up without OS-level keepalive.
    pub read_write_timeout_ms: u64,

    /// Idle time before the first keepalive probe, in milliseconds.
    pub keepalive_idle_ms: u64,

    /// Interval between keepalive probes, in milliseconds.
    pub keepalive_interval_ms: u64,

    /// Unanswered probes before the peer is considered dead.
    pub keepalive_probe_count: u32,

    /// Nameserver queried when system resolution fails or returns nothing
    /// (e.g. "8.8.8.8:53", UDP).
    pub fallback_nameserver: String,

    /// What to do when enabling keepalive on a fresh connection fails.
    pub on_keepalive_failure: KeepaliveFailurePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_ms: 1_000,
            connect_timeout_ms: 1_000,
            handshake_timeout_ms: 1_000,
            read_write_timeout_ms: 60_000,
            keepalive_idle_ms: 1_000,
            keepalive_interval_ms: 1_000,
            keepalive_probe_count: 3,
            fallback_nameserver: "8.8.8.8:53".to_string(),
            on_keepalive_failure: KeepaliveFailurePolicy::FailDial,
        }
    }
}

impl ClientConfig {
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn read_write_timeout(&self) -> Duration {
        Duration::from_millis(self.read_write_timeout_ms)
    }

    pub fn keepalive_idle(&self) -> Duration {
        Duration::from_millis(self.keepalive_idle_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }
}

/// Policy applied when enabling TCP keepalive on an established connection
/// fails.
///
/// The default closes the connection and fails the dial, so a connection
/// without dead-peer detection never enters service. Deployments that
/// prefer availability opt into `DegradeToDeadline`, which keeps the
/// connection with only the fixed read/write deadline applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepaliveFailurePolicy {
    FailDial,
    DegradeToDeadline,
}
