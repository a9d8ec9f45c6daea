// # fwsyncd - Firewall Sync Daemon
//
// This daemon is a THIN integration layer over fwsync-core:
// - DO NOT add matching, caching or device logic here
// - Configuration is via environment variables ONLY
//
// The fwsyncd daemon is responsible for:
// 1. Reading and validating configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering transports and domain-list sources
// 4. Seeding the cache and loading the watch list
// 5. Running exactly one observation source until SIGTERM/SIGINT
//
// ## Configuration
//
// ### Device
// - `FWSYNC_ROUTER_HOST`: Device host name or address (required)
// - `FWSYNC_ROUTER_PORT`: SSH port (default: 22)
// - `FWSYNC_ROUTER_USER`: SSH user (required)
// - `FWSYNC_ROUTER_PASSWORD`: SSH password (required)
// - `FWSYNC_ADDRESS_LIST`: Address list receiving new entries (required)
// - `FWSYNC_SSH_CONNECT_TIMEOUT_SECS`: Connect timeout (default: 10)
// - `FWSYNC_SSH_COMMAND_TIMEOUT_SECS`: Per-command timeout (default: 30)
//
// ### Watched domains (at least one of)
// - `FWSYNC_DOMAINS`: Comma-separated patterns, same syntax as list lines
// - `FWSYNC_DOMAIN_LIST_URLS`: Comma-separated list URLs (http, https, file)
//
// ### Observation source
// - `FWSYNC_SOURCE`: `proxy` (default) or `log_poll`
// - `FWSYNC_LISTEN_ADDR`: Proxy listen address (default: `:53`)
// - `FWSYNC_UPSTREAM_ADDR`: Upstream resolver (required for `proxy`)
// - `FWSYNC_UPSTREAM_TIMEOUT_MS`: Upstream reply timeout (default: 5000)
// - `FWSYNC_POLL_INTERVAL_SECS`: Log poll interval; the lookback is twice this (default: 2)
//
// ### Logging
// - `FWSYNC_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export FWSYNC_ROUTER_HOST=192.168.88.1
// export FWSYNC_ROUTER_USER=fwsync
// export FWSYNC_ROUTER_PASSWORD=...
// export FWSYNC_ADDRESS_LIST=vpn_route
// export FWSYNC_DOMAIN_LIST_URLS=https://example.org/geosite/netflix.txt
// export FWSYNC_UPSTREAM_ADDR=1.1.1.1:53
//
// fwsyncd
// ```

use anyhow::{Context, Result};
use fwsync_core::config::{
    DomainsConfig, EngineConfig, FwsyncConfig, RouterConfig, SourceConfig, TransportConfig,
    parse_socket_addr,
};
use fwsync_core::matcher::parse_line;
use fwsync_core::traits::{CommandTransport, FirewallSync};
use fwsync_core::{AddressCache, ComponentRegistry, DomainMatcher, LogPoller, RouterOsClient};
use fwsync_core::{Observer, SyncPipeline};
use fwsync_proxy::DnsProxy;
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Time allowed for the observation source to stop after a signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum FwsyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<FwsyncExitCode> for ExitCode {
    fn from(code: FwsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon configuration, as read from the environment
#[derive(Debug)]
struct Config {
    router_host: String,
    router_port: u16,
    router_user: String,
    router_password: Secret,
    address_list: String,
    connect_timeout_secs: u64,
    command_timeout_secs: u64,
    domains: Vec<String>,
    domain_list_urls: Vec<String>,
    source: String,
    listen_addr: String,
    upstream_addr: Option<String>,
    upstream_timeout_ms: u64,
    poll_interval_secs: u64,
    log_level: String,
}

/// Password wrapper keeping the value out of `Debug` output
struct Secret(String);

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<REDACTED>")
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} is required", name))
        };
        let list = |name: &str| -> Vec<String> {
            lookup(name)
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };

        Ok(Self {
            router_host: required("FWSYNC_ROUTER_HOST")?,
            router_port: parse_var(&lookup, "FWSYNC_ROUTER_PORT", 22)?,
            router_user: required("FWSYNC_ROUTER_USER")?,
            router_password: Secret(required("FWSYNC_ROUTER_PASSWORD")?),
            address_list: required("FWSYNC_ADDRESS_LIST")?,
            connect_timeout_secs: parse_var(&lookup, "FWSYNC_SSH_CONNECT_TIMEOUT_SECS", 10)?,
            command_timeout_secs: parse_var(&lookup, "FWSYNC_SSH_COMMAND_TIMEOUT_SECS", 30)?,
            domains: list("FWSYNC_DOMAINS"),
            domain_list_urls: list("FWSYNC_DOMAIN_LIST_URLS"),
            source: lookup("FWSYNC_SOURCE").unwrap_or_else(|| "proxy".to_string()),
            listen_addr: lookup("FWSYNC_LISTEN_ADDR").unwrap_or_else(|| ":53".to_string()),
            upstream_addr: lookup("FWSYNC_UPSTREAM_ADDR").filter(|v| !v.trim().is_empty()),
            upstream_timeout_ms: parse_var(&lookup, "FWSYNC_UPSTREAM_TIMEOUT_MS", 5000)?,
            poll_interval_secs: parse_var(&lookup, "FWSYNC_POLL_INTERVAL_SECS", 2)?,
            log_level: lookup("FWSYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// This performs validation beyond what fwsync-core checks:
    /// - Type enumeration validation
    /// - Numeric range validation
    /// - Placeholder secret detection
    /// - Domain pattern syntax and list URL schemes
    fn validate(&self) -> Result<()> {
        if self.router_port == 0 {
            anyhow::bail!("FWSYNC_ROUTER_PORT must be between 1 and 65535");
        }

        // Check for obvious placeholder passwords (common mistake)
        let password_lower = self.router_password.0.to_lowercase();
        if password_lower.contains("your_password")
            || password_lower.contains("replace_me")
            || password_lower == "password"
            || password_lower == "changeme"
        {
            anyhow::bail!(
                "FWSYNC_ROUTER_PASSWORD appears to be a placeholder. \
                Use the actual password of the device user."
            );
        }

        match self.source.as_str() {
            "proxy" => {
                if self.upstream_addr.is_none() {
                    anyhow::bail!(
                        "FWSYNC_UPSTREAM_ADDR is required when FWSYNC_SOURCE=proxy. \
                        Set it via: export FWSYNC_UPSTREAM_ADDR=1.1.1.1:53"
                    );
                }
            }
            "log_poll" => {}
            _ => anyhow::bail!(
                "FWSYNC_SOURCE '{}' is not supported. \
                Supported sources: proxy, log_poll",
                self.source
            ),
        }

        if !(1..=3600).contains(&self.poll_interval_secs) {
            anyhow::bail!(
                "FWSYNC_POLL_INTERVAL_SECS must be between 1 and 3600 seconds. Got: {}",
                self.poll_interval_secs
            );
        }

        if !(100..=60_000).contains(&self.upstream_timeout_ms) {
            anyhow::bail!(
                "FWSYNC_UPSTREAM_TIMEOUT_MS must be between 100 and 60000. Got: {}",
                self.upstream_timeout_ms
            );
        }

        if self.domains.is_empty() && self.domain_list_urls.is_empty() {
            anyhow::bail!(
                "Set FWSYNC_DOMAINS or FWSYNC_DOMAIN_LIST_URLS. \
                Example: export FWSYNC_DOMAINS=example.com,domain:example.org"
            );
        }

        for domain in &self.domains {
            match parse_line(domain) {
                Some(pattern) => validate_domain_name(&pattern)?,
                None => anyhow::bail!("FWSYNC_DOMAINS entry is not a domain pattern: '{}'", domain),
            }
        }

        for url in &self.domain_list_urls {
            let supported = ["https://", "http://", "file://"]
                .iter()
                .any(|scheme| url.starts_with(scheme));
            if !supported {
                anyhow::bail!(
                    "FWSYNC_DOMAIN_LIST_URLS entry must use http, https or file scheme. Got: {}",
                    url
                );
            }
            if url.starts_with("http://") {
                eprintln!(
                    "WARNING: domain list {} uses HTTP (not HTTPS). \
                    This is less secure. Consider using HTTPS.",
                    url
                );
            }
        }

        // Validate log level
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "FWSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the library configuration and run its own validation
    fn to_fwsync_config(&self) -> Result<FwsyncConfig> {
        let source = match self.source.as_str() {
            "log_poll" => SourceConfig::LogPoll {
                interval_secs: self.poll_interval_secs,
                lookback_secs: self.poll_interval_secs.saturating_mul(2),
            },
            _ => SourceConfig::Proxy {
                listen_addr: self.listen_addr.clone(),
                upstream_addr: self.upstream_addr.clone().unwrap_or_default(),
                upstream_timeout_ms: self.upstream_timeout_ms,
            },
        };

        let config = FwsyncConfig {
            router: RouterConfig {
                address_list: self.address_list.clone(),
            },
            transport: TransportConfig::Ssh {
                host: self.router_host.clone(),
                port: self.router_port,
                user: self.router_user.clone(),
                password: self.router_password.0.clone(),
                connect_timeout_secs: self.connect_timeout_secs,
                command_timeout_secs: self.command_timeout_secs,
            },
            domains: DomainsConfig {
                static_domains: self.domains.clone(),
                list_urls: self.domain_list_urls.clone(),
            },
            source,
            engine: EngineConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Parse an optional numeric variable, falling back to `default` when unset
fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a number. Got: '{}'", name, value)),
    }
}

/// Validate that a pattern is a plausible domain name
///
/// This implements basic DNS domain name validation per RFC 1035.
/// One trailing dot is accepted.
fn validate_domain_name(domain: &str) -> Result<()> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    if domain.is_empty() {
        anyhow::bail!("Domain name cannot be empty");
    }

    // Total length limit (RFC 1035: 253 chars max)
    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        // Underscores appear in service labels (_dmarc, _sip._tcp)
        if !label
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric, hyphen and underscore only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return FwsyncExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return FwsyncExitCode::ConfigError.into();
    }

    let fwsync_config = match config.to_fwsync_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return FwsyncExitCode::ConfigError.into();
        }
    };

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return FwsyncExitCode::ConfigError.into();
    }

    info!("Starting fwsyncd daemon");
    debug!("Configuration: {:?}", config);

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return FwsyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(fwsync_config).await {
            Ok(()) => FwsyncExitCode::CleanShutdown,
            Err(DaemonError::Startup(e)) => {
                error!("Startup failed: {:#}", e);
                FwsyncExitCode::ConfigError
            }
            Err(DaemonError::Runtime(e)) => {
                error!("Daemon error: {:#}", e);
                FwsyncExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Failure of `run_daemon`, split by exit code
enum DaemonError {
    /// Anything before the observation source started
    Startup(anyhow::Error),
    /// Failure while serving
    Runtime(anyhow::Error),
}

/// Run the daemon
async fn run_daemon(config: FwsyncConfig) -> std::result::Result<(), DaemonError> {
    let registry = ComponentRegistry::new();

    #[cfg(feature = "ssh")]
    {
        info!("Registering SSH transport");
        fwsync_ssh::register(&registry);
    }

    #[cfg(feature = "http-lists")]
    {
        info!("Registering HTTP domain lists");
        fwsync_lists_http::register(&registry);
    }

    fwsync_core::lists::register(&registry);

    let (client, pipeline) = start(&registry, &config)
        .await
        .map_err(DaemonError::Startup)?;

    let cancel = CancellationToken::new();
    let mut source = tokio::spawn(run_source(config.source, client, pipeline, cancel.clone()));

    tokio::select! {
        received = wait_for_shutdown() => {
            let signal = received.map_err(DaemonError::Runtime)?;
            info!("Received shutdown signal: {}", signal);
            info!("Shutting down daemon");
            cancel.cancel();

            match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut source).await {
                Ok(joined) => joined
                    .map_err(|e| DaemonError::Runtime(e.into()))?
                    .map_err(DaemonError::Runtime)?,
                Err(_) => {
                    source.abort();
                    return Err(DaemonError::Runtime(anyhow::anyhow!(
                        "Shutdown timeout after {:?}",
                        SHUTDOWN_TIMEOUT
                    )));
                }
            }
        }

        joined = &mut source => {
            joined
                .map_err(|e| DaemonError::Runtime(e.into()))?
                .map_err(DaemonError::Runtime)?;
            warn!("Observation source stopped without a shutdown signal");
        }
    }

    Ok(())
}

/// Seed the cache, load the watch list and assemble the pipeline
async fn start(
    registry: &ComponentRegistry,
    config: &FwsyncConfig,
) -> Result<(Arc<RouterOsClient>, Arc<SyncPipeline>)> {
    let transport: Arc<dyn CommandTransport> = Arc::from(
        registry
            .create_transport(&config.transport)
            .context("Failed to create transport")?,
    );
    let client = Arc::new(RouterOsClient::new(transport, &config.router.address_list));

    let existing = client
        .list_addresses(&config.router.address_list)
        .await
        .context("Failed to get addresses from list")?;
    let cache = AddressCache::new();
    let loaded = existing.len();
    cache.seed(existing).await;
    info!("Loaded {} IP addresses from device", loaded);

    let sources = config
        .domains
        .list_urls
        .iter()
        .map(|url| registry.create_list_source(url))
        .collect::<fwsync_core::Result<Vec<_>>>()
        .context("Failed to create domain list source")?;

    let matcher = DomainMatcher::load(&config.domains.static_domains, &sources)
        .await
        .context("Failed to load domain list")?;
    info!("Watching {} domain pattern(s)", matcher.len());

    let (pipeline, mut events) =
        SyncPipeline::new(Arc::new(matcher), cache, client.clone(), &config.engine);

    // Ends once the last pipeline handle is dropped
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Pipeline event: {:?}", event);
        }
    });

    Ok((client, Arc::new(pipeline)))
}

/// Run the configured observation source until `cancel` fires
async fn run_source(
    source: SourceConfig,
    client: Arc<RouterOsClient>,
    pipeline: Arc<SyncPipeline>,
    cancel: CancellationToken,
) -> Result<()> {
    let observer: Arc<dyn Observer> = pipeline;

    match source {
        SourceConfig::Proxy {
            listen_addr,
            upstream_addr,
            upstream_timeout_ms,
        } => {
            let listen = parse_socket_addr("listen", &listen_addr)?;
            let upstream = parse_socket_addr("upstream", &upstream_addr)?;

            let proxy = DnsProxy::bind(
                listen,
                upstream,
                Duration::from_millis(upstream_timeout_ms),
                observer,
            )
            .await
            .context("Failed to start DNS proxy")?;

            proxy.run(cancel).await?;
        }
        SourceConfig::LogPoll {
            interval_secs,
            lookback_secs,
        } => {
            let sync: Arc<dyn FirewallSync> = client;
            let poller = LogPoller::with_interval(
                sync,
                observer,
                Duration::from_secs(interval_secs),
                Duration::from_secs(lookback_secs),
            );

            poller.run(cancel).await?;
        }
    }

    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
