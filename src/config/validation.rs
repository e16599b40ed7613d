//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, probe count > 0)
//! - Check the fallback nameserver parses as a socket address
//!
//! # Design Decisions
//! - Returns all violations, not just the first
//! - Runs once at client construction, before any dial

use std::net::SocketAddr;

use thiserror::Error;

use super::ClientConfig;

/// A single configuration violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("keepalive_probe_count must be greater than zero")]
    ZeroProbeCount,

    #[error("fallback_nameserver {value:?} is not a valid socket address")]
    InvalidNameserver { value: String },
}

/// All violations found in one configuration.
#[derive(Debug, Error)]
#[error("configuration invalid: {}", format_violations(.violations))]
pub struct ConfigError {
    pub violations: Vec<Violation>,
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| violation.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ClientConfig {
    /// Check for values that would break the dial pipeline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut violations = Vec::new();

        let durations = [
            ("resolve_timeout_ms", self.resolve_timeout_ms),
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("handshake_timeout_ms", self.handshake_timeout_ms),
            ("read_write_timeout_ms", self.read_write_timeout_ms),
            ("keepalive_idle_ms", self.keepalive_idle_ms),
            ("keepalive_interval_ms", self.keepalive_interval_ms),
        ];
        for (field, value) in durations {
            if value == 0 {
                violations.push(Violation::ZeroDuration { field });
            }
        }

        if self.keepalive_probe_count == 0 {
            violations.push(Violation::ZeroProbeCount);
        }

        if self.fallback_nameserver.parse::<SocketAddr>().is_err() {
            violations.push(Violation::InvalidNameserver {
                value: self.fallback_nameserver.clone(),
            });
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ConfigError { violations })
        }
    }

    /// The fallback nameserver as a socket address.
    ///
    /// Callers run [`validate`](Self::validate) first, so this only fails
    /// on configs that bypassed validation.
    pub fn fallback_nameserver_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.fallback_nameserver
            .parse()
            .map_err(|_| ConfigError {
                violations: vec![Violation::InvalidNameserver {
                    value: self.fallback_nameserver.clone(),
                }],
            })
    }
}
