// # fwsync-core
//
// Core library for mirroring DNS-observed addresses into a firewall
// address list.
//
// ## Architecture Overview
//
// This library provides the pieces that carry real invariants:
// - **dns**: Alias-chain resolution over a decoded answer section
// - **DomainMatcher**: Suffix-based watch-list membership
// - **AddressCache**: Deduplicating set of addresses already on the device
// - **RouterOsClient**: Text-command sync client behind the `FirewallSync` trait
// - **SyncPipeline**: Matcher → Cache → Sync wiring behind the `Observer` trait
// - **LogPoller**: Single-flight periodic log polling feeding the pipeline
// - **ComponentRegistry**: Plugin-based registry for transports and list sources
// - **lists**: Built-in `file://` domain list source
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Transport, DNS forwarding and list fetching
//    live in their own crates and only see the traits defined here
// 2. **Confirmed-only caching**: An address is cached only after the device
//    acknowledged the write
// 3. **Explicit state**: The cache is constructed once and passed around,
//    never global
// 4. **Library-First**: The daemon is a thin layer over this crate

pub mod traits;
pub mod dns;
pub mod matcher;
pub mod cache;
pub mod routeros;
pub mod pipeline;
pub mod poller;
pub mod registry;
pub mod lists;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{CommandTransport, DomainListSource, FirewallSync, Observer, SyncOutcome};
pub use dns::{AnswerRecord, resolve};
pub use matcher::DomainMatcher;
pub use cache::AddressCache;
pub use routeros::RouterOsClient;
pub use pipeline::{PipelineEvent, SyncPipeline};
pub use poller::LogPoller;
pub use registry::ComponentRegistry;
pub use config::{FwsyncConfig, SourceConfig, TransportConfig};
pub use error::{Error, Result};
