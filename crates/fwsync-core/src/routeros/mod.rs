// # RouterOS Sync Client
//
// `FirewallSync` implementation speaking the RouterOS console language over
// any `CommandTransport`.
//
// ## Commands
//
// ```text
// /ip firewall address-list print where list=<list>
// /ip firewall address-list add address=<ip> list=<list> comment="<domain>"
// /log print where topics~"dns" and topics~"packet" and time>(... - <window>)
// ```
//
// IPv6 addresses live under `/ipv6 firewall address-list` with the same
// syntax. Listing covers both menus; a device without the IPv6 menu (the
// `print` is rejected as a command) contributes no IPv6 entries.
//
// ## Partial failure
//
// Adds are issued one command per address, in input order. The first failure
// ends the batch: the confirmed prefix is returned alongside the error and the
// remaining addresses are left untouched. Nothing is retried here.

pub mod command;
pub mod parse;

use crate::error::{Error, Result};
use crate::traits::{CommandTransport, FirewallSync, SyncOutcome};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use command::Family;
use tracing::{debug, info, warn};

/// RouterOS address-list client
pub struct RouterOsClient {
    /// Transport used for every command
    transport: Arc<dyn CommandTransport>,

    /// Address list that receives new entries
    address_list: String,
}

impl std::fmt::Debug for RouterOsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterOsClient")
            .field("transport", &self.transport.transport_name())
            .field("address_list", &self.address_list)
            .finish()
    }
}

impl RouterOsClient {
    /// Create a new client
    ///
    /// # Parameters
    ///
    /// - `transport`: Transport that delivers commands to the device
    /// - `address_list`: Name of the address list to write to
    pub fn new(transport: Arc<dyn CommandTransport>, address_list: impl Into<String>) -> Self {
        Self {
            transport,
            address_list: address_list.into(),
        }
    }
}

#[async_trait]
impl FirewallSync for RouterOsClient {
    async fn list_addresses(&self, list_name: &str) -> Result<Vec<String>> {
        let mut addresses = Vec::new();

        for family in Family::ALL {
            let output = match self
                .transport
                .execute(&command::print_address_list(family, list_name))
                .await
            {
                Ok(output) => output,
                Err(Error::Command(e)) if family == Family::V6 => {
                    warn!("Skipping IPv6 address list {}: {}", list_name, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            addresses.extend(parse::parse_address_list(&output, list_name));
        }

        debug!("Address list {} holds {} address(es)", list_name, addresses.len());
        Ok(addresses)
    }

    async fn add_addresses(&self, domain: &str, addresses: &[String]) -> SyncOutcome {
        let mut confirmed = Vec::with_capacity(addresses.len());

        for address in addresses {
            let cmd = command::add_address(address, &self.address_list, domain);
            if let Err(e) = self.transport.execute(&cmd).await {
                return SyncOutcome::partial(confirmed, e);
            }

            info!(
                "IP {} added to address-list {} with comment {}",
                address, self.address_list, domain
            );
            confirmed.push(address.clone());
        }

        SyncOutcome::complete(confirmed)
    }

    async fn poll_log_addresses(
        &self,
        lookback: Duration,
    ) -> Result<HashMap<String, BTreeSet<String>>> {
        let output = self
            .transport
            .execute(&command::print_dns_log(lookback))
            .await?;

        Ok(parse::parse_dns_log(&output))
    }

    fn address_list(&self) -> &str {
        &self.address_list
    }
}
