// # SSH Command Transport
//
// This crate provides the SSH `CommandTransport` for fwsync: every command is
// run through an `exec` request on a password-authenticated session.
//
// ## Trust Level: Untrusted (Transport)
//
// **Allowed Capabilities**:
// - ✅ Open a TCP connection to the configured device only
// - ✅ Keep one authenticated session open between commands
//
// **Forbidden Capabilities**:
// - ❌ Interpret command output (owned by `RouterOsClient`)
// - ❌ Retry failed commands
// - ❌ Spawn tasks or threads
//
// ## Session Handling
//
// The session is opened lazily on the first command and reused afterwards.
// Commands are serialized over it. A transport-level failure or a timeout
// drops the session; the next command reconnects.
//
// ## Security Requirements
//
// - The password NEVER appears in logs or `Debug` output
// - Host keys are accepted without verification. Deploy on a trusted
//   management network only.

use async_trait::async_trait;
use fwsync_core::config::TransportConfig;
use fwsync_core::traits::{CommandTransport, TransportFactory};
use fwsync_core::{ComponentRegistry, Error, Result};
use russh::ChannelMsg;
use russh::client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Client handler accepting any server host key
struct AcceptAnyHostKey;

#[async_trait]
impl client::Handler for AcceptAnyHostKey {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh_keys::key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}

/// SSH transport to the device console
pub struct SshTransport {
    /// Device host name or address
    host: String,

    /// SSH port
    port: u16,

    /// Login user
    user: String,

    /// Login password
    /// ⚠️ NEVER log this value
    password: String,

    /// Bound on TCP connect plus authentication
    connect_timeout: Duration,

    /// Bound on a single command, from channel open to exit
    command_timeout: Duration,

    /// Client protocol configuration
    config: Arc<client::Config>,

    /// Open session, if any
    session: Mutex<Option<client::Handle<AcceptAnyHostKey>>>,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for SshTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshTransport")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<REDACTED>")
            .field("connect_timeout", &self.connect_timeout)
            .field("command_timeout", &self.command_timeout)
            .finish_non_exhaustive()
    }
}

impl SshTransport {
    /// Create a new transport
    ///
    /// No connection is made until the first command.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            connect_timeout,
            command_timeout,
            config: Arc::new(client::Config::default()),
            session: Mutex::new(None),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Dial and authenticate a new session
    async fn connect(&self) -> Result<client::Handle<AcceptAnyHostKey>> {
        let handshake = async {
            let mut handle = client::connect(
                self.config.clone(),
                (self.host.as_str(), self.port),
                AcceptAnyHostKey,
            )
            .await
            .map_err(|e| Error::transport(format!("Failed to dial {}: {}", self.endpoint(), e)))?;

            let accepted = handle
                .authenticate_password(&self.user, &self.password)
                .await
                .map_err(|e| Error::transport(format!("SSH authentication failed: {}", e)))?;

            if !accepted {
                return Err(Error::auth(format!(
                    "Device rejected password for user {}",
                    self.user
                )));
            }

            Ok::<_, Error>(handle)
        };

        let handle = tokio::time::timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| {
                Error::timeout(format!(
                    "Connecting to {} took longer than {:?}",
                    self.endpoint(),
                    self.connect_timeout
                ))
            })??;

        tracing::debug!("SSH session to {} established", self.endpoint());
        Ok(handle)
    }

    /// Run one command on an open session
    ///
    /// Returns stdout and stderr combined, in arrival order. A missing exit
    /// status is an error.
    async fn run(handle: &client::Handle<AcceptAnyHostKey>, command: &str) -> Result<String> {
        let mut channel = handle
            .channel_open_session()
            .await
            .map_err(|e| Error::transport(format!("Failed to create session: {}", e)))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::transport(format!("Failed to run command: {}", e)))?;

        let mut output = Vec::new();
        let mut exit_status = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => output.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, .. } => output.extend_from_slice(data),
                ChannelMsg::ExitStatus { exit_status: code } => exit_status = Some(code),
                _ => {}
            }
        }

        command_result(&output, exit_status)
    }
}

/// Judge a finished channel by its exit status
///
/// A channel that closed without reporting a status did not necessarily run
/// the command to completion, so it is a transport failure, never success.
fn command_result(output: &[u8], exit_status: Option<u32>) -> Result<String> {
    let output = String::from_utf8_lossy(output).into_owned();
    match exit_status {
        Some(0) => Ok(output),
        Some(code) => Err(Error::command(format!(
            "Command exited with status {}: {}",
            code,
            output.trim()
        ))),
        None => Err(Error::transport(format!(
            "Channel closed without exit status: {}",
            output.trim()
        ))),
    }
}

#[async_trait]
impl CommandTransport for SshTransport {
    async fn execute(&self, command: &str) -> Result<String> {
        let mut session = self.session.lock().await;

        let handle = match session.take() {
            Some(handle) if !handle.is_closed() => handle,
            _ => self.connect().await?,
        };

        match tokio::time::timeout(self.command_timeout, Self::run(&handle, command)).await {
            Ok(Ok(output)) => {
                *session = Some(handle);
                Ok(output)
            }
            Ok(Err(e)) => {
                // The session survives a failing command, not a broken channel
                if matches!(e, Error::Command(_)) {
                    *session = Some(handle);
                }
                Err(e)
            }
            Err(_) => Err(Error::timeout(format!(
                "Command on {} took longer than {:?}",
                self.endpoint(),
                self.command_timeout
            ))),
        }
    }

    fn transport_name(&self) -> &'static str {
        "ssh"
    }
}

/// Factory for creating SSH transports
pub struct SshFactory;

impl TransportFactory for SshFactory {
    fn create(&self, config: &TransportConfig) -> Result<Box<dyn CommandTransport>> {
        match config {
            TransportConfig::Ssh {
                host,
                port,
                user,
                password,
                connect_timeout_secs,
                command_timeout_secs,
            } => {
                config.validate()?;
                if password.is_empty() {
                    return Err(Error::config("SSH password is required"));
                }

                Ok(Box::new(SshTransport::new(
                    host.clone(),
                    *port,
                    user.clone(),
                    password.clone(),
                    Duration::from_secs(*connect_timeout_secs),
                    Duration::from_secs(*command_timeout_secs),
                )))
            }
            _ => Err(Error::config("Invalid config for SSH transport")),
        }
    }
}

/// Register the SSH transport with a registry
///
/// # Example
///
/// ```rust
/// use fwsync_core::ComponentRegistry;
///
/// let registry = ComponentRegistry::new();
/// fwsync_ssh::register(&registry);
/// assert!(registry.has_transport("ssh"));
/// ```
pub fn register(registry: &ComponentRegistry) {
    registry.register_transport("ssh", Box::new(SshFactory));
}
