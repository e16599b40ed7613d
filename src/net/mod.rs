//! Transport-level connection subsystem.
//!
//! # Data Flow
//! ```text
//! resolved addresses + port
//!     → dial.rs (random selection, up to 2 attempts, connect timeout)
//!     → keepalive.rs (OS keepalive, or deadline.rs fallback)
//!     → ConfiguredStream handed to the HTTP engine
//! ```
//!
//! # Design Decisions
//! - Random selection spreads load without any cross-call state
//! - Keepalive support is an injected predicate, not a compile-time switch
//! - A connection that cannot get keepalive either fails the dial or
//!   carries a fixed read/write deadline, per configured policy

pub mod deadline;
pub mod dial;
pub mod keepalive;

pub use deadline::DeadlineStream;
pub use dial::{AddressPicker, ConnectError, Establisher, RandomPicker};
pub use keepalive::{
    ConfiguredStream, KeepaliveConfigurer, KeepaliveError, KeepaliveParams, KeepaliveSupport,
};
