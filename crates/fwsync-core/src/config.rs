//! Configuration types for fwsync
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main fwsync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FwsyncConfig {
    /// Device address-list settings
    pub router: RouterConfig,

    /// How commands reach the device
    pub transport: TransportConfig,

    /// Watched domains
    pub domains: DomainsConfig,

    /// Where observations come from
    pub source: SourceConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl FwsyncConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.router.validate()?;
        self.transport.validate()?;
        self.domains.validate()?;
        self.source.validate()?;
        Ok(())
    }
}

/// Device address-list settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Address list receiving new entries
    pub address_list: String,
}

impl RouterConfig {
    /// Validate the router configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.address_list.is_empty() {
            return Err(crate::Error::config("Address list name cannot be empty"));
        }
        // Embedded literally in commands, so it must stay a single token
        if self
            .address_list
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == ';' || c == '$')
        {
            return Err(crate::Error::config(format!(
                "Address list name contains forbidden characters: {:?}",
                self.address_list
            )));
        }
        Ok(())
    }
}

/// Command transport configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    /// SSH with password authentication
    Ssh {
        /// Device host name or address
        host: String,
        /// SSH port
        #[serde(default = "default_ssh_port")]
        port: u16,
        /// Login user
        user: String,
        /// Login password
        password: String,
        /// Connect timeout in seconds
        #[serde(default = "default_connect_timeout_secs")]
        connect_timeout_secs: u64,
        /// Per-command timeout in seconds
        #[serde(default = "default_command_timeout_secs")]
        command_timeout_secs: u64,
    },

    /// Custom transport
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl TransportConfig {
    /// Validate the transport configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            TransportConfig::Ssh {
                host,
                port,
                user,
                connect_timeout_secs,
                command_timeout_secs,
                ..
            } => {
                if host.is_empty() {
                    return Err(crate::Error::config("SSH host cannot be empty"));
                }
                if *port == 0 {
                    return Err(crate::Error::config("SSH port must be > 0"));
                }
                if user.is_empty() {
                    return Err(crate::Error::config("SSH user cannot be empty"));
                }
                if *connect_timeout_secs == 0 || *command_timeout_secs == 0 {
                    return Err(crate::Error::config("SSH timeouts must be > 0"));
                }
                Ok(())
            }
            TransportConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom transport factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom transport config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the transport type name
    pub fn type_name(&self) -> &str {
        match self {
            TransportConfig::Ssh { .. } => "ssh",
            TransportConfig::Custom { factory, .. } => factory,
        }
    }
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportConfig::Ssh {
                host,
                port,
                user,
                connect_timeout_secs,
                command_timeout_secs,
                ..
            } => f
                .debug_struct("Ssh")
                .field("host", host)
                .field("port", port)
                .field("user", user)
                .field("password", &"<REDACTED>")
                .field("connect_timeout_secs", connect_timeout_secs)
                .field("command_timeout_secs", command_timeout_secs)
                .finish(),
            TransportConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .finish_non_exhaustive(),
        }
    }
}

/// Watched domain configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainsConfig {
    /// Inline patterns (same syntax as list lines)
    #[serde(default)]
    pub static_domains: Vec<String>,

    /// Locations of remote domain lists
    #[serde(default)]
    pub list_urls: Vec<String>,
}

impl DomainsConfig {
    /// Validate the domains configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        let has_static = self.static_domains.iter().any(|d| !d.trim().is_empty());
        if !has_static && self.list_urls.is_empty() {
            return Err(crate::Error::config("No watched domains or domain lists configured"));
        }
        if let Some(url) = self.list_urls.iter().find(|u| !u.contains("://")) {
            return Err(crate::Error::config(format!(
                "Domain list location must be a URL: {}",
                url
            )));
        }
        Ok(())
    }
}

/// Observation source configuration
///
/// Exactly one source is active per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Intercept DNS by forwarding client queries
    Proxy {
        /// Address the forwarder listens on
        listen_addr: String,
        /// Upstream resolver queries are forwarded to
        upstream_addr: String,
        /// Upstream response timeout in milliseconds
        #[serde(default = "default_upstream_timeout_ms")]
        upstream_timeout_ms: u64,
    },

    /// Poll the device's DNS packet log
    LogPoll {
        /// Poll interval in seconds
        #[serde(default = "default_poll_interval_secs")]
        interval_secs: u64,
        /// Lookback window in seconds
        #[serde(default = "default_poll_lookback_secs")]
        lookback_secs: u64,
    },
}

impl SourceConfig {
    /// Validate the source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SourceConfig::Proxy {
                listen_addr,
                upstream_addr,
                upstream_timeout_ms,
            } => {
                parse_socket_addr("listen", listen_addr)?;
                parse_socket_addr("upstream", upstream_addr)?;
                if *upstream_timeout_ms == 0 {
                    return Err(crate::Error::config("Upstream timeout must be > 0"));
                }
                Ok(())
            }
            SourceConfig::LogPoll {
                interval_secs,
                lookback_secs,
            } => {
                if *interval_secs == 0 {
                    return Err(crate::Error::config("Log poll interval must be > 0"));
                }
                if *lookback_secs == 0 {
                    return Err(crate::Error::config("Log poll lookback must be > 0"));
                }
                Ok(())
            }
        }
    }

    /// Get the source type name
    pub fn type_name(&self) -> &'static str {
        match self {
            SourceConfig::Proxy { .. } => "proxy",
            SourceConfig::LogPoll { .. } => "log_poll",
        }
    }
}

/// Parse a socket address, accepting the `:53` shorthand for all interfaces
pub fn parse_socket_addr(what: &str, value: &str) -> Result<SocketAddr, crate::Error> {
    let candidate = if value.starts_with(':') {
        format!("0.0.0.0{}", value)
    } else {
        value.to_string()
    };
    candidate
        .parse()
        .map_err(|_| crate::Error::config(format!("Invalid {} address: {}", what, value)))
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the pipeline event channel
    ///
    /// When full, new events are dropped. Observations are never blocked by
    /// a slow event consumer.
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_ssh_port() -> u16 {
    22
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_command_timeout_secs() -> u64 {
    30
}

fn default_upstream_timeout_ms() -> u64 {
    5000
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_poll_lookback_secs() -> u64 {
    default_poll_interval_secs() * 2
}

fn default_event_channel_capacity() -> usize {
    1000
}
