//! Core traits for fwsync
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`CommandTransport`]: Run a command string on the remote device
//! - [`FirewallSync`]: Push and read back address-list state on the device
//! - [`DomainListSource`]: Fetch raw watch-list text lines
//! - [`Observer`]: Receive domain → addresses observations

pub mod transport;
pub mod firewall;
pub mod list_source;
pub mod observer;

pub use transport::{CommandTransport, TransportFactory};
pub use firewall::{FirewallSync, SyncOutcome};
pub use list_source::{DomainListSource, DomainListSourceFactory};
pub use observer::Observer;
