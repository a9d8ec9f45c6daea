//! Observation pipeline
//!
//! The SyncPipeline is responsible for:
//! - Dropping observations for domains outside the watch list
//! - Filtering out addresses already known to be on the device
//! - Pushing the rest through `FirewallSync`
//! - Caching only what the device confirmed
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │  DNS proxy   │   │  LogPoller   │
//! └──────────────┘   └──────────────┘
//!         │ on_observation   │
//!         └────────┬─────────┘
//!                  ▼
//!         ┌──────────────────┐
//!         │   SyncPipeline   │
//!         └──────────────────┘
//!                  │
//!     ┌────────────┼─────────────┬──────────────┐
//!     ▼            ▼             ▼              ▼
//! ┌────────┐ ┌──────────┐ ┌──────────────┐ ┌──────────┐
//! │Matcher │ │  Cache   │ │ FirewallSync │ │  Events  │
//! │(filter)│ │(contains)│ │ (add)        │ │ (notify) │
//! └────────┘ └──────────┘ └──────────────┘ └──────────┘
//! ```
//!
//! ## Event Flow
//!
//! 1. Observation arrives for a domain
//! 2. Domain checked against the watch list
//! 3. Addresses not in the cache are sent to the device
//! 4. Confirmed addresses are added to the cache
//! 5. Failures are logged with the unconfirmed addresses; nothing is raised

use crate::cache::AddressCache;
use crate::config::EngineConfig;
use crate::matcher::DomainMatcher;
use crate::traits::{FirewallSync, Observer};
use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Events emitted by the SyncPipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A watched domain resolved to addresses not yet cached
    Observed {
        domain: String,
        new_addresses: Vec<String>,
    },

    /// A watched domain resolved only to cached addresses
    AlreadySynced {
        domain: String,
    },

    /// Every new address was written to the device
    Synced {
        domain: String,
        addresses: Vec<String>,
    },

    /// The batch stopped early
    SyncFailed {
        domain: String,
        confirmed: Vec<String>,
        unconfirmed: Vec<String>,
        error: String,
    },
}

/// Matcher → Cache → Sync wiring
///
/// One instance is shared (behind an `Arc`) by every observation source. It
/// holds no mutable state of its own; the cache is the only shared mutable
/// object and carries its own lock.
pub struct SyncPipeline {
    /// Watch list
    matcher: Arc<DomainMatcher>,

    /// Addresses known to be on the device
    cache: AddressCache,

    /// Device client
    sync: Arc<dyn FirewallSync>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<PipelineEvent>,
}

impl SyncPipeline {
    /// Create a new pipeline
    ///
    /// # Returns
    ///
    /// A tuple of (pipeline, event_receiver) where event_receiver yields pipeline events
    pub fn new(
        matcher: Arc<DomainMatcher>,
        cache: AddressCache,
        sync: Arc<dyn FirewallSync>,
        config: &EngineConfig,
    ) -> (Self, mpsc::Receiver<PipelineEvent>) {
        let (tx, rx) = mpsc::channel(config.event_channel_capacity.max(1));

        let pipeline = Self {
            matcher,
            cache,
            sync,
            event_tx: tx,
        };

        (pipeline, rx)
    }

    /// The cache this pipeline updates
    pub fn cache(&self) -> &AddressCache {
        &self.cache
    }

    /// Addresses of `addresses` that are not cached, deduplicated, in order
    async fn uncached(&self, addresses: &[IpAddr]) -> Vec<String> {
        let mut fresh: Vec<String> = Vec::new();
        for addr in addresses {
            let addr = addr.to_string();
            if fresh.contains(&addr) || self.cache.contains(&addr).await {
                continue;
            }
            fresh.push(addr);
        }
        fresh
    }

    /// Emit a pipeline event
    fn emit_event(&self, event: PipelineEvent) {
        if self.event_tx.try_send(event).is_err() {
            // Full or closed: monitoring lags behind, the pipeline does not wait
            debug!("Event channel full or closed, dropping pipeline event");
        }
    }
}

#[async_trait]
impl Observer for SyncPipeline {
    async fn on_observation(&self, domain: &str, addresses: &[IpAddr]) {
        if !self.matcher.contains_any(domain) {
            return;
        }

        let fresh = self.uncached(addresses).await;
        if fresh.is_empty() {
            debug!("All addresses of {} already synced", domain);
            self.emit_event(PipelineEvent::AlreadySynced {
                domain: domain.to_string(),
            });
            return;
        }

        self.emit_event(PipelineEvent::Observed {
            domain: domain.to_string(),
            new_addresses: fresh.clone(),
        });

        let outcome = self.sync.add_addresses(domain, &fresh).await;

        if !outcome.confirmed.is_empty() {
            self.cache.add_if_new(&outcome.confirmed).await;
        }

        match &outcome.error {
            None => {
                self.emit_event(PipelineEvent::Synced {
                    domain: domain.to_string(),
                    addresses: outcome.confirmed.clone(),
                });
            }
            Some(e) => {
                let unconfirmed = outcome.unconfirmed(&fresh);
                warn!(
                    "Failed to add IPs {} of domain {} to address list: {}",
                    unconfirmed.join(", "),
                    domain,
                    e
                );
                self.emit_event(PipelineEvent::SyncFailed {
                    domain: domain.to_string(),
                    confirmed: outcome.confirmed.clone(),
                    unconfirmed: unconfirmed.to_vec(),
                    error: e.to_string(),
                });
            }
        }
    }
}
