//! Client configuration subsystem.
//!
//! # Data Flow
//! ```text
//! construction (defaults, config file, or builder)
//!     → schema.rs (serde deserialization, millisecond fields)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → shared via Arc across all concurrent requests
//! ```
//!
//! # Design Decisions
//! - Config is immutable after client construction; no reload path
//! - All fields have defaults so a zero-config client works
//! - Durations are stored as integer milliseconds for serde friendliness,
//!   with accessor methods converting to `Duration`

pub mod schema;
pub mod validation;

pub use schema::{ClientConfig, KeepaliveFailurePolicy};
pub use validation::ConfigError;
