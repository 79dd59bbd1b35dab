//! Network Reachability Tester - Common Library
//!
//! Shared types, configuration, device session handling and output
//! parsing used by the `nrt` CLI.

#![deny(unsafe_code)]

pub mod config;
pub mod logging;
pub mod manifest;
pub mod mock;
pub mod parser;
pub mod session;
pub mod types;

pub use config::{ConfigError, DeviceConfig, NrtConfig, ProbeConfig, ReportConfig, load_config};
pub use logging::{LogConfig, LogFormat, LoggingGuards, init_logging};
pub use manifest::{ManifestError, load_destinations, load_sources};
pub use parser::{
    ParseError, PingStats, parse_bgp_secondary, parse_ping_statistics, parse_route_destination,
};
pub use session::{
    DeviceSession, DeviceTransport, KnownHostsPolicy, SessionError, SessionOptions, SshSession,
    SshTransport,
};
pub use types::{
    DestinationLabel, PRIMARY_DC, ProbeResult, RunRow, SECONDARY_DC, SourceDevice,
    destination_labels,
};
