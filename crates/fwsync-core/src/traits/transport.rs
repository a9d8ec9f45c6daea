// # Command Transport Trait
//
// Defines the interface for executing a command string on the remote device.
//
// ## Implementations
//
// - SSH: `fwsync-ssh` crate
// - Tests: scripted in-memory transports
//
// ## Usage
//
// ```rust,ignore
// use fwsync_core::CommandTransport;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let transport = /* CommandTransport implementation */;
//
//     let output = transport
//         .execute("/ip firewall address-list print where list=watchlist")
//         .await?;
//     println!("{}", output);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for command transport implementations
///
/// A transport turns a command string into the raw text the device printed,
/// or an error when the command could not be delivered or failed.
///
/// # Trust Level: Untrusted
///
/// Transports are **untrusted** integrations with strict limitations:
///
/// ## Allowed Capabilities
/// - ✅ Open a connection to the configured device only
/// - ✅ Apply their own connect and command timeouts
/// - ✅ Return success or failure (callers decide what to do next)
///
/// ## Forbidden Capabilities
/// - ❌ Retry failed commands (a retried `add` may double-write)
/// - ❌ Parse or interpret command output (owned by `RouterOsClient`)
/// - ❌ Touch the address cache (owned by `SyncPipeline`)
/// - ❌ Keep session state between calls that callers could depend on
///
/// ## Statelessness
///
/// Callers treat every `execute` as independent. One connection per call is
/// acceptable; pooling is an implementation detail that must stay invisible.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Execute a command on the remote device
    ///
    /// # Parameters
    ///
    /// - `command`: The complete command line, values already embedded
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: Everything the device printed
    /// - `Err(Error)`: Connection, session or command failure
    async fn execute(&self, command: &str) -> Result<String, crate::Error>;

    /// Get the transport name (for logging/debugging)
    fn transport_name(&self) -> &'static str;
}

/// Helper trait for constructing transports from configuration
pub trait TransportFactory: Send + Sync {
    /// Create a CommandTransport instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this transport
    ///
    /// # Returns
    ///
    /// A boxed CommandTransport trait object
    fn create(
        &self,
        config: &crate::config::TransportConfig,
    ) -> Result<Box<dyn CommandTransport>, crate::Error>;
}
