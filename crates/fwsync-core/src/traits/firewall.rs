// # Firewall Sync Trait
//
// Defines the interface for mirroring addresses into the device's address list.
//
// ## Implementations
//
// - RouterOS text commands: `crate::routeros::RouterOsClient`

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// Result of a batch add
///
/// Addresses are written one at a time, in input order. `confirmed` is the
/// prefix the device acknowledged; when `error` is set, the address at
/// `confirmed.len()` failed and everything after it was never attempted.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    /// Addresses the device acknowledged, in input order
    pub confirmed: Vec<String>,
    /// The error that stopped the batch, if any
    pub error: Option<crate::Error>,
}

impl SyncOutcome {
    /// A fully successful batch
    pub fn complete(confirmed: Vec<String>) -> Self {
        Self {
            confirmed,
            error: None,
        }
    }

    /// A batch stopped by `error` after `confirmed` were written
    pub fn partial(confirmed: Vec<String>, error: crate::Error) -> Self {
        Self {
            confirmed,
            error: Some(error),
        }
    }

    /// Whether every attempted address was confirmed
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// The addresses of `attempted` whose remote state is unknown
    ///
    /// Relies on the in-order contract: the unconfirmed addresses are the
    /// suffix following the confirmed prefix.
    pub fn unconfirmed<'a>(&self, attempted: &'a [String]) -> &'a [String] {
        let start = self.confirmed.len().min(attempted.len());
        &attempted[start..]
    }
}

/// Trait for firewall sync implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe; the DNS path calls them from many
/// request tasks at once.
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Compose device commands and send them through a `CommandTransport`
/// - ✅ Parse device output, dropping rows it cannot understand
///
/// ## Forbidden Capabilities
/// - ❌ Retry failed adds (the confirmed prefix is the only partial-failure mechanism)
/// - ❌ Touch the address cache (owned by `SyncPipeline`)
/// - ❌ Delete or roll back entries on the device
#[async_trait]
pub trait FirewallSync: Send + Sync {
    /// List the addresses currently in `list_name`
    ///
    /// Used once at startup to seed the address cache.
    async fn list_addresses(&self, list_name: &str) -> Result<Vec<String>, crate::Error>;

    /// Add `addresses` to the configured list, commented with `domain`
    ///
    /// Never returns an error directly: failures are folded into the
    /// returned [`SyncOutcome`] together with the confirmed prefix.
    async fn add_addresses(&self, domain: &str, addresses: &[String]) -> SyncOutcome;

    /// Collect A-record answers from the device's DNS packet log
    ///
    /// # Parameters
    ///
    /// - `lookback`: How far back in the log to look
    ///
    /// # Returns
    ///
    /// A map of domain → set of addresses seen in the window
    async fn poll_log_addresses(
        &self,
        lookback: Duration,
    ) -> Result<HashMap<String, BTreeSet<String>>, crate::Error>;

    /// The address list this client writes to
    fn address_list(&self) -> &str;
}
