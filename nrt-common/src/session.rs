//! Device session client over SSH.
//!
//! Opens an interactive-equivalent session to one network device,
//! issues diagnostic CLI commands with per-command read timeouts, and
//! closes the session exactly once per successful open. The concrete
//! transport is the `openssh` crate; the [`DeviceTransport`] /
//! [`DeviceSession`] traits seam it so probe logic can run against a
//! scripted device in tests (see [`crate::mock`]).

use crate::config::DeviceConfig;
use openssh::{KnownHosts, SessionBuilder};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default connection timeout. Generous: edge routers under load can
/// take a long while to accept a session.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default per-command read timeout. Diagnostic commands such as a
/// repeat-count ping legitimately run for tens of seconds.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(100);

/// Errors from device session handling.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// Session open failed.
    #[error("connection to {address} failed: {message}")]
    Connect { address: String, message: String },

    /// A command did not produce output within its read timeout.
    #[error("command timed out after {timeout_secs}s on {address}")]
    CommandTimeout { address: String, timeout_secs: u64 },

    /// The transport failed mid-command.
    #[error("transport failure on {address}: {message}")]
    Transport { address: String, message: String },
}

impl SessionError {
    /// True when the failure looks transient (worth a reconnect).
    ///
    /// Conservative by design: auth, host-key and resolution problems
    /// are never retried, since repeating those can only fail again
    /// or lock an account.
    pub fn is_transient(&self) -> bool {
        match self {
            SessionError::CommandTimeout { .. } => true,
            SessionError::Connect { message, .. } | SessionError::Transport { message, .. } => {
                is_transient_transport_error(message)
            }
        }
    }
}

/// Message-level classification of SSH transport failures.
pub fn is_transient_transport_error(message: &str) -> bool {
    let message = message.to_lowercase();

    if message.contains("permission denied")
        || message.contains("host key verification failed")
        || message.contains("could not resolve hostname")
        || message.contains("authentication")
        || message.contains("identity file")
    {
        return false;
    }

    message.contains("timed out")
        || message.contains("connection reset")
        || message.contains("connection refused")
        || message.contains("connection closed")
        || message.contains("broken pipe")
        || message.contains("network is unreachable")
        || message.contains("no route to host")
        || message.contains("kex_exchange_identification")
}

/// Known-hosts policy for device connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KnownHostsPolicy {
    /// Strictly verify known hosts.
    Strict,
    /// Add unknown hosts automatically. The default: device fleets
    /// churn RMAs faster than anyone curates known_hosts.
    #[default]
    Add,
    /// Accept all hosts without verification (lab use only).
    AcceptAll,
}

/// Session behavior knobs derived from [`DeviceConfig`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Session open timeout.
    pub connect_timeout: Duration,
    /// Per-command read timeout.
    pub command_timeout: Duration,
    /// SSH port on the device.
    pub port: u16,
    /// Extra open attempts after a transient connect failure.
    pub connect_retries: u32,
    /// Known-hosts handling.
    pub known_hosts: KnownHostsPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            port: 22,
            connect_retries: 0,
            known_hosts: KnownHostsPolicy::default(),
        }
    }
}

impl SessionOptions {
    /// Derive options from the device section of the configuration.
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            command_timeout: Duration::from_secs(config.read_timeout_secs),
            port: config.port,
            connect_retries: config.connect_retries,
            known_hosts: KnownHostsPolicy::default(),
        }
    }
}

/// An open session to one device.
pub trait DeviceSession: Send {
    /// Run one CLI command and return its captured output.
    fn execute(
        &mut self,
        command: &str,
    ) -> impl Future<Output = Result<String, SessionError>> + Send;

    /// Terminate the session. Consumes the session so it cannot be
    /// closed twice or used afterwards.
    fn close(self) -> impl Future<Output = Result<(), SessionError>> + Send;
}

/// Factory for device sessions; one per fleet run.
pub trait DeviceTransport: Send + Sync {
    type Session: DeviceSession;

    /// Open a session to the device at `address`.
    fn open(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Self::Session, SessionError>> + Send;
}

/// Production transport backed by the `openssh` crate.
///
/// Authentication is key/agent based: when `identity_file` is set it
/// is offered explicitly, otherwise the ambient SSH agent applies.
/// The password field of the configuration travels opaquely for
/// transports that can use it; this one does not interpret it.
#[derive(Debug, Clone)]
pub struct SshTransport {
    username: String,
    identity_file: Option<String>,
    options: SessionOptions,
}

impl SshTransport {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            username: config.username.clone(),
            identity_file: config.identity_file.clone(),
            options: SessionOptions::from_config(config),
        }
    }

    fn builder(&self) -> SessionBuilder {
        let known_hosts = match self.options.known_hosts {
            KnownHostsPolicy::Strict => KnownHosts::Strict,
            KnownHostsPolicy::Add => KnownHosts::Add,
            KnownHostsPolicy::AcceptAll => KnownHosts::Accept,
        };

        let mut builder = SessionBuilder::default();
        builder
            .user(self.username.clone())
            .port(self.options.port)
            .known_hosts_check(known_hosts)
            .connect_timeout(self.options.connect_timeout);

        if let Some(identity) = &self.identity_file {
            let expanded = shellexpand::tilde(identity);
            if Path::new(expanded.as_ref()).exists() {
                builder.keyfile(expanded.as_ref());
            } else {
                warn!(identity = %identity, "identity file not found, relying on agent");
            }
        }

        builder
    }

    async fn connect_once(&self, address: &str) -> Result<openssh::Session, SessionError> {
        self.builder()
            .connect(address)
            .await
            .map_err(|e| SessionError::Connect {
                address: address.to_string(),
                message: e.to_string(),
            })
    }
}

impl DeviceTransport for SshTransport {
    type Session = SshSession;

    async fn open(&self, address: &str) -> Result<SshSession, SessionError> {
        debug!(address, "opening device session");

        let mut attempt = 0;
        let session = loop {
            match self.connect_once(address).await {
                Ok(session) => break session,
                Err(err) if attempt < self.options.connect_retries && err.is_transient() => {
                    attempt += 1;
                    warn!(
                        address,
                        attempt,
                        error = %err,
                        "transient connect failure, retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        };

        info!(address, "device session established");
        Ok(SshSession {
            address: address.to_string(),
            command_timeout: self.options.command_timeout,
            inner: session,
        })
    }
}

/// An established SSH session to one device.
pub struct SshSession {
    address: String,
    command_timeout: Duration,
    inner: openssh::Session,
}

impl DeviceSession for SshSession {
    async fn execute(&mut self, command: &str) -> Result<String, SessionError> {
        debug!(address = %self.address, command, "executing device command");

        // Device CLIs parse the whole line themselves (pipes included),
        // so the command goes over as a single exec payload.
        let mut cmd = self.inner.raw_command(command);
        let run = cmd.output();

        let output = match tokio::time::timeout(self.command_timeout, run).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(SessionError::Transport {
                    address: self.address.clone(),
                    message: e.to_string(),
                });
            }
            Err(_) => {
                warn!(
                    address = %self.address,
                    command,
                    timeout_secs = self.command_timeout.as_secs(),
                    "device command timed out"
                );
                return Err(SessionError::CommandTimeout {
                    address: self.address.clone(),
                    timeout_secs: self.command_timeout.as_secs(),
                });
            }
        };

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn close(self) -> Result<(), SessionError> {
        debug!(address = %self.address, "closing device session");
        self.inner
            .close()
            .await
            .map_err(|e| SessionError::Transport {
                address: self.address,
                message: e.to_string(),
            })
    }
}
