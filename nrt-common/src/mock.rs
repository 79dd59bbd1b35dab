//! Scripted device transport for deterministic testing.
//!
//! Implements [`DeviceTransport`](crate::session::DeviceTransport)
//! over an in-memory fleet description so probe and orchestration
//! logic can be exercised without any real SSH connection. Each mock
//! device answers the three command shapes the probe issues (route
//! query, BGP query, ping) from canned output, and can be scripted to
//! refuse connections, fail mid-sequence, or respond slowly to force
//! out-of-order completion.

use crate::session::{DeviceSession, DeviceTransport, SessionError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned device output in the formats the parser understands.
pub mod sample {
    /// A default-route summary resolving via `next_hop`.
    pub fn route_via(next_hop: &str) -> String {
        format!("  * {next_hop}, from {next_hop}, 3w2d ago\n")
    }

    /// A BGP best-path summary listing one line per path address.
    pub fn bgp_paths(addresses: &[&str]) -> String {
        addresses
            .iter()
            .map(|addr| format!("    {addr} from {addr} (10.255.0.1)\n"))
            .collect()
    }

    /// A fully successful repeat-5 ping with the given timings.
    pub fn ping_ok(min: u32, avg: u32, max: u32) -> String {
        format!(
            "Type escape sequence to abort.\n\
             Sending 5, 100-byte ICMP Echos, timeout is 2 seconds:\n\
             !!!!!\n\
             Success rate is 100 percent (5/5), round-trip min/avg/max = {min}/{avg}/{max} ms\n"
        )
    }

    /// A ping where every echo timed out.
    pub fn ping_no_reply() -> String {
        "Type escape sequence to abort.\n\
         Sending 5, 100-byte ICMP Echos, timeout is 2 seconds:\n\
         .....\n\
         Success rate is 0 percent (0/5)\n"
            .to_string()
    }
}

/// Script for one mock device.
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    /// Reply to the default-route query; `None` yields empty output.
    pub route_output: Option<String>,
    /// Reply to the BGP query; `None` yields empty output.
    pub bgp_output: Option<String>,
    /// Ping replies keyed by pinged address; unknown addresses get a
    /// zero-success reply.
    pub ping_outputs: HashMap<String, String>,
    /// When set, session open fails with this message.
    pub connect_error: Option<String>,
    /// When set, every command past the Nth fails with a transport
    /// error (counting all executed commands, warm-ups included).
    pub fail_after_commands: Option<usize>,
    /// Artificial latency per command, for completion-order tests.
    pub command_delay: Option<Duration>,
}

impl MockDevice {
    /// A healthy device: routes via `primary`, offers `secondary` as
    /// the alternate path, and answers every ping with `min/avg/max`.
    pub fn healthy(primary: &str, secondary: &str, min: u32, avg: u32, max: u32) -> Self {
        Self {
            route_output: Some(sample::route_via(primary)),
            bgp_output: Some(sample::bgp_paths(&[primary, secondary])),
            ping_outputs: HashMap::new(),
            connect_error: None,
            fail_after_commands: None,
            command_delay: None,
        }
        .with_default_ping(sample::ping_ok(min, avg, max))
    }

    /// A device that refuses connections.
    pub fn unreachable(message: &str) -> Self {
        Self {
            connect_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Answer pings to `address` with `output`.
    pub fn with_ping(mut self, address: &str, output: String) -> Self {
        self.ping_outputs.insert(address.to_string(), output);
        self
    }

    /// Answer pings to any un-scripted address with `output`.
    pub fn with_default_ping(mut self, output: String) -> Self {
        self.ping_outputs.insert(String::new(), output);
        self
    }

    /// Delay every command by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.command_delay = Some(delay);
        self
    }

    /// Fail every command past the Nth.
    pub fn failing_after(mut self, commands: usize) -> Self {
        self.fail_after_commands = Some(commands);
        self
    }
}

/// In-memory fleet of scripted devices.
#[derive(Debug, Clone, Default)]
pub struct MockFleet {
    devices: HashMap<String, MockDevice>,
    executed: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device script under its address.
    pub fn device(mut self, address: &str, script: MockDevice) -> Self {
        self.devices.insert(address.to_string(), script);
        self
    }

    /// Every `(address, command)` pair executed so far, in order.
    pub fn executed_commands(&self) -> Vec<(String, String)> {
        self.executed.lock().expect("command log poisoned").clone()
    }
}

impl DeviceTransport for MockFleet {
    type Session = MockSession;

    async fn open(&self, address: &str) -> Result<MockSession, SessionError> {
        let mut script = self
            .devices
            .get(address)
            .cloned()
            .ok_or_else(|| SessionError::Connect {
                address: address.to_string(),
                message: "no such device scripted".to_string(),
            })?;

        if let Some(message) = script.connect_error.take() {
            return Err(SessionError::Connect {
                address: address.to_string(),
                message,
            });
        }

        Ok(MockSession {
            address: address.to_string(),
            script,
            commands_run: 0,
            log: self.executed.clone(),
        })
    }
}

/// An open scripted session.
pub struct MockSession {
    address: String,
    script: MockDevice,
    commands_run: usize,
    log: Arc<Mutex<Vec<(String, String)>>>,
}

impl DeviceSession for MockSession {
    async fn execute(&mut self, command: &str) -> Result<String, SessionError> {
        if let Some(delay) = self.script.command_delay {
            tokio::time::sleep(delay).await;
        }

        self.log
            .lock()
            .expect("command log poisoned")
            .push((self.address.clone(), command.to_string()));

        self.commands_run += 1;
        if let Some(limit) = self.script.fail_after_commands
            && self.commands_run > limit
        {
            return Err(SessionError::Transport {
                address: self.address.clone(),
                message: "connection reset by peer".to_string(),
            });
        }

        if command.starts_with("show ip route") {
            return Ok(self.script.route_output.clone().unwrap_or_default());
        }
        if command.starts_with("show ip bgp") {
            return Ok(self.script.bgp_output.clone().unwrap_or_default());
        }
        if let Some(rest) = command.strip_prefix("ping ") {
            let target = rest.split_whitespace().next().unwrap_or_default();
            let reply = self
                .script
                .ping_outputs
                .get(target)
                .or_else(|| self.script.ping_outputs.get(""))
                .cloned()
                .unwrap_or_else(sample::ping_no_reply);
            return Ok(reply);
        }

        Ok(String::new())
    }

    async fn close(self) -> Result<(), SessionError> {
        Ok(())
    }
}
