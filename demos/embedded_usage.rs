//! Minimal embedding example for fwsync-core
//!
//! This example drives the library against an in-memory RouterOS console:
//! the cache is seeded from the device, the DNS log is polled, and watched
//! answers land in the address list. The poller lifecycle is fully managed
//! by the application.

use fwsync_core::config::EngineConfig;
use fwsync_core::traits::{CommandTransport, FirewallSync};
use fwsync_core::{
    AddressCache, DomainMatcher, Error, LogPoller, Result, RouterOsClient, SyncPipeline,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// In-memory stand-in for a RouterOS console
struct EmbeddedConsole {
    list: String,
    entries: Mutex<Vec<(String, String)>>,
    log: Mutex<String>,
}

impl EmbeddedConsole {
    fn new(list: &str, existing: &[&str]) -> Self {
        Self {
            list: list.to_string(),
            entries: Mutex::new(
                existing
                    .iter()
                    .map(|a| (a.to_string(), "seed".to_string()))
                    .collect(),
            ),
            log: Mutex::new(String::new()),
        }
    }

    /// Append a DNS answer to the device log
    fn log_answer(&self, domain: &str, address: &str) {
        if let Ok(mut log) = self.log.lock() {
            log.push_str(&format!("dns,packet <{}:A:ttl=60:{}>\n", domain, address));
        }
    }

    fn render(&self) -> String {
        let mut out = String::from("Flags: X - disabled\n #   LIST   ADDRESS\n");
        if let Ok(entries) = self.entries.lock() {
            for (address, comment) in entries.iter() {
                out.push_str(&format!(" ;;; {}\n {} {}\n", comment, self.list, address));
            }
        }
        out
    }
}

#[async_trait::async_trait]
impl CommandTransport for EmbeddedConsole {
    async fn execute(&self, command: &str) -> Result<String> {
        println!("[Console] {}", command);

        if command.starts_with("/log print") {
            return Ok(self.log.lock().map(|l| l.clone()).unwrap_or_default());
        }
        if command.starts_with("/ipv6 firewall address-list print") {
            return Err(Error::command("bad command name ipv6 (package disabled)"));
        }
        if command.contains("address-list print") {
            return Ok(self.render());
        }
        if command.contains("address-list add") {
            let field = |key: &str| {
                command
                    .split_whitespace()
                    .find_map(|t| t.strip_prefix(key))
                    .map(|v| v.trim_matches('"').to_string())
            };
            let address = field("address=").ok_or_else(|| Error::command("missing address"))?;
            let comment = field("comment=").unwrap_or_default();
            if let Ok(mut entries) = self.entries.lock() {
                entries.push((address, comment));
            }
            return Ok(String::new());
        }

        Err(Error::command(format!("bad command name: {}", command)))
    }

    fn transport_name(&self) -> &'static str {
        "embedded"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    println!("=== Embedded fwsync-core Example ===\n");

    let console = Arc::new(EmbeddedConsole::new("vpn_route", &["203.0.113.5"]));
    let client = Arc::new(RouterOsClient::new(console.clone(), "vpn_route"));

    // Seed the cache from the device
    println!("1. Seeding cache from device...");
    let cache = AddressCache::new();
    cache.seed(client.list_addresses("vpn_route").await?).await;
    println!("   {} address(es) already on the device\n", cache.len().await);

    let matcher = Arc::new(DomainMatcher::from_lines(["example.com", "domain:example.org"]));
    let (pipeline, mut event_rx) = SyncPipeline::new(
        matcher,
        cache,
        client.clone(),
        &EngineConfig {
            event_channel_capacity: 100,
        },
    );

    // Spawn event listener (optional)
    let event_listener = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            println!("[Event] {:?}", event);
        }
    });

    println!("2. Starting log poller in background...");
    let poller = LogPoller::with_interval(
        client.clone(),
        Arc::new(pipeline),
        Duration::from_millis(100),
        Duration::from_secs(2),
    );
    let cancel = CancellationToken::new();
    let poller_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { poller.run(cancel).await })
    };

    // Simulate clients resolving names through the router
    console.log_answer("www.example.com", "93.184.216.34");
    console.log_answer("cdn.example.org", "198.51.100.7");
    console.log_answer("unrelated.test", "192.0.2.200");
    console.log_answer("example.com", "203.0.113.5");

    tokio::time::sleep(Duration::from_millis(350)).await;

    println!("\n3. Stopping poller...");
    cancel.cancel();
    if let Ok(Err(e)) = poller_handle.await {
        eprintln!("Poller failed: {}", e);
    }
    let _ = tokio::time::timeout(Duration::from_millis(100), event_listener).await;

    println!("\n4. Address list now holds:");
    for address in client.list_addresses("vpn_route").await? {
        println!("   {}", address);
    }

    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- Cache is explicit and passed in, never global");
    println!("- Only addresses the device confirmed are cached");
    println!("- Poller lifecycle is controlled by the application's token");

    Ok(())
}
