//! Test doubles and common utilities for architecture contract tests
//!
//! The doubles sit below the real `RouterOsClient`, so contract tests drive
//! the actual command composition and output parsing end to end.

#![allow(dead_code)]

use async_trait::async_trait;
use fwsync_core::error::{Error, Result};
use fwsync_core::traits::{CommandTransport, Observer};
use std::net::IpAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Transport that behaves like a small RouterOS device
///
/// Understands the three commands the client issues:
/// - `address-list print` renders the current list of the menu's family
/// - `address-list add` appends to the list, failing once `fail_after`
///   adds have succeeded
/// - `/log print` returns the configured log text after `log_delay`
pub struct SimulatedRouter {
    list: String,
    entries: Mutex<Vec<(String, String)>>,
    fail_after: Option<usize>,
    adds: AtomicUsize,
    log_output: Mutex<String>,
    log_delay: Duration,
    log_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    commands: Mutex<Vec<String>>,
}

impl SimulatedRouter {
    /// Create a device holding `list` with no entries
    pub fn new(list: &str) -> Self {
        Self {
            list: list.to_string(),
            entries: Mutex::new(Vec::new()),
            fail_after: None,
            adds: AtomicUsize::new(0),
            log_output: Mutex::new(String::new()),
            log_delay: Duration::ZERO,
            log_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Fail every add after the first `n` successful ones
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Delay every log query by `delay`
    pub fn with_log_delay(mut self, delay: Duration) -> Self {
        self.log_delay = delay;
        self
    }

    /// Pre-populate the address list
    pub fn with_entries(self, addresses: &[&str]) -> Self {
        {
            let mut entries = self.entries.lock().unwrap();
            for address in addresses {
                entries.push((self.list.clone(), address.to_string()));
            }
        }
        self
    }

    /// Replace the text returned by log queries
    pub fn set_log(&self, output: &str) {
        *self.log_output.lock().unwrap() = output.to_string();
    }

    /// Addresses currently in the simulated list, in insertion order
    pub fn addresses(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(list, _)| *list == self.list)
            .map(|(_, address)| address.clone())
            .collect()
    }

    /// Number of add commands received, failed ones included
    pub fn add_attempts(&self) -> usize {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.contains("address-list add"))
            .count()
    }

    /// Number of log queries received
    pub fn log_calls(&self) -> usize {
        self.log_calls.load(Ordering::SeqCst)
    }

    /// Highest number of commands ever executing at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Render the entries of one menu; the IPv6 menu prints `/128` hosts
    fn render_list(&self, ipv6: bool) -> String {
        let mut out = String::from("Flags: X - disabled, D - dynamic\n #   LIST      ADDRESS\n");
        for (list, address) in self.entries.lock().unwrap().iter() {
            match (ipv6, address.contains(':')) {
                (true, true) => out.push_str(&format!(" ;;; fwsync\n {}  {}/128\n", list, address)),
                (false, false) => out.push_str(&format!(" ;;; fwsync\n {}  {}\n", list, address)),
                _ => {}
            }
        }
        out
    }

    fn apply_add(&self, command: &str) -> Result<String> {
        let done = self.adds.load(Ordering::SeqCst);
        if self.fail_after.is_some_and(|n| done >= n) {
            return Err(Error::command("failure: connection reset"));
        }

        let field = |key: &str| {
            command
                .split_whitespace()
                .find_map(|token| token.strip_prefix(key))
                .map(str::to_string)
        };
        let (Some(address), Some(list)) = (field("address="), field("list=")) else {
            return Err(Error::command("syntax error"));
        };

        self.entries.lock().unwrap().push((list, address));
        self.adds.fetch_add(1, Ordering::SeqCst);
        Ok(String::new())
    }
}

#[async_trait]
impl CommandTransport for SimulatedRouter {
    async fn execute(&self, command: &str) -> Result<String> {
        self.commands.lock().unwrap().push(command.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = if command.starts_with("/log print") {
            self.log_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.log_delay).await;
            Ok(self.log_output.lock().unwrap().clone())
        } else if command.contains("address-list print") {
            Ok(self.render_list(command.starts_with("/ipv6")))
        } else if command.contains("address-list add") {
            self.apply_add(command)
        } else {
            Err(Error::command(format!("bad command name: {}", command)))
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn transport_name(&self) -> &'static str {
        "simulated"
    }
}

/// Observer that records every observation it receives
#[derive(Default)]
pub struct RecordingObserver {
    seen: Mutex<Vec<(String, Vec<IpAddr>)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded observations, in arrival order
    pub fn seen(&self) -> Vec<(String, Vec<IpAddr>)> {
        self.seen.lock().unwrap().clone()
    }

    /// Number of observations received
    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Observer for RecordingObserver {
    async fn on_observation(&self, domain: &str, addresses: &[IpAddr]) {
        self.seen
            .lock()
            .unwrap()
            .push((domain.to_string(), addresses.to_vec()));
    }
}

/// Parse a list of address literals
pub fn ips(list: &[&str]) -> Vec<IpAddr> {
    list.iter().map(|s| s.parse().unwrap()).collect()
}

/// One DNS packet log line carrying an A answer
pub fn a_answer(domain: &str, address: &str) -> String {
    format!("12:00:00 dns,packet <{}:A:ttl=60:{}>\n", domain, address)
}
