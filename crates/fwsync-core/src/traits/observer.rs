// # Observer Trait
//
// Receives domain → addresses observations from either the DNS forwarder or
// the log poller.

use async_trait::async_trait;
use std::net::IpAddr;

/// Sink for domain → addresses observations
///
/// Implementations must not surface errors to the caller: the DNS forwarder
/// still has to relay its reply, and the poller still has to keep ticking.
#[async_trait]
pub trait Observer: Send + Sync {
    /// Handle the addresses `domain` resolved to
    async fn on_observation(&self, domain: &str, addresses: &[IpAddr]);
}
