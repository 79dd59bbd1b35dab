//! Per-device probe sequence.
//!
//! One invocation drives one device session end to end: discover the
//! primary and secondary data-center addresses from the routing and
//! BGP tables, then ping every destination in column order. A probe
//! always yields a [`RunRow`]; failures degrade to sentinel cells and
//! never escape to the caller, so one sick device cannot take down a
//! fleet run.

use nrt_common::config::ProbeConfig;
use nrt_common::parser::{parse_bgp_secondary, parse_ping_statistics, parse_route_destination};
use nrt_common::session::{DeviceSession, DeviceTransport};
use nrt_common::types::{ProbeResult, RunRow, SourceDevice};
use tracing::{debug, warn};

/// Query for the route currently resolving the default prefix.
pub const DEFAULT_ROUTE_QUERY: &str = "show ip route 0.0.0.0 | i , from";

/// Query for the BGP paths carrying the default prefix.
pub const BGP_PATH_QUERY: &str = "show ip bgp 0.0.0.0 | i from 1";

/// Build the repeat-count ping command for one destination.
pub fn ping_command(address: &str, repeat: u32) -> String {
    format!("ping {address} repeat {repeat}")
}

/// Probe behavior for one run.
#[derive(Debug, Clone, Copy)]
pub struct ProbeOptions {
    /// Echo count per ping.
    pub repeat: u32,
    /// Ping twice per destination, discarding the first output, so
    /// ARP/adjacency warm-up does not pollute the measurement.
    pub warmup: bool,
}

impl From<&ProbeConfig> for ProbeOptions {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            repeat: config.repeat,
            warmup: config.warmup,
        }
    }
}

/// Probe every destination from one source device.
///
/// The result row always has exactly `2 + destinations.len()`
/// entries: Primary-DC, Secondary-DC, then the fixed destinations in
/// manifest order.
pub async fn probe_source<T: DeviceTransport>(
    transport: &T,
    source: &SourceDevice,
    destinations: &[String],
    options: ProbeOptions,
) -> RunRow {
    let column_count = 2 + destinations.len();

    let mut session = match transport.open(&source.address).await {
        Ok(session) => session,
        Err(err) => {
            warn!(device = %source, error = %err, "session open failed");
            return RunRow::all_errors(source.clone(), column_count);
        }
    };

    let results = probe_sequence(&mut session, source, destinations, options).await;

    if let Err(err) = session.close().await {
        debug!(device = %source, error = %err, "session close failed");
    }

    debug_assert_eq!(results.len(), column_count);
    RunRow {
        source: source.clone(),
        results,
    }
}

/// Discovery plus the ping loop. Infallible by construction: every
/// failure mode is converted into result cells.
async fn probe_sequence<S: DeviceSession>(
    session: &mut S,
    source: &SourceDevice,
    destinations: &[String],
    options: ProbeOptions,
) -> Vec<ProbeResult> {
    let column_count = 2 + destinations.len();

    // Discovery is a prerequisite for every column: without the data
    // center addresses nothing was attempted, so any failure here
    // marks the whole row.
    let targets = match discover_targets(session, source, destinations).await {
        Some(targets) => targets,
        None => return vec![ProbeResult::Error; column_count],
    };

    let mut results = Vec::with_capacity(column_count);
    for target in &targets {
        let command = ping_command(target, options.repeat);

        if options.warmup {
            if let Err(err) = session.execute(&command).await {
                warn!(device = %source, target, error = %err, "warm-up probe failed");
                pad_with_errors(&mut results, column_count);
                return results;
            }
        }

        match session.execute(&command).await {
            Ok(raw) => match parse_ping_statistics(&raw) {
                Ok(stats) => results.push(stats.probe_result()),
                Err(err) => {
                    // Unrecognized ping output is a measurement gap,
                    // not a device failure.
                    warn!(device = %source, target, error = %err, "unparseable ping output");
                    results.push(ProbeResult::NoReply);
                }
            },
            Err(err) => {
                warn!(device = %source, target, error = %err, "probe command failed");
                pad_with_errors(&mut results, column_count);
                return results;
            }
        }
    }

    results
}

/// Resolve the full target list: Primary-DC, Secondary-DC, then the
/// fixed destinations. `None` means discovery failed.
async fn discover_targets<S: DeviceSession>(
    session: &mut S,
    source: &SourceDevice,
    destinations: &[String],
) -> Option<Vec<String>> {
    let route_raw = match session.execute(DEFAULT_ROUTE_QUERY).await {
        Ok(raw) => raw,
        Err(err) => {
            warn!(device = %source, error = %err, "default-route query failed");
            return None;
        }
    };
    let primary = match parse_route_destination(&route_raw) {
        Ok(address) => address,
        Err(err) => {
            warn!(device = %source, error = %err, "primary DC discovery failed");
            return None;
        }
    };

    let bgp_raw = match session.execute(BGP_PATH_QUERY).await {
        Ok(raw) => raw,
        Err(err) => {
            warn!(device = %source, error = %err, "BGP path query failed");
            return None;
        }
    };
    let secondary = match parse_bgp_secondary(&bgp_raw, &primary) {
        Ok(address) => address,
        Err(err) => {
            warn!(device = %source, error = %err, "secondary DC discovery failed");
            return None;
        }
    };

    debug!(device = %source, primary, secondary, "discovered data center addresses");

    let mut targets = Vec::with_capacity(2 + destinations.len());
    targets.push(primary);
    targets.push(secondary);
    targets.extend(destinations.iter().cloned());
    Some(targets)
}

/// Mark this and every remaining destination as failed.
fn pad_with_errors(results: &mut Vec<ProbeResult>, column_count: usize) {
    while results.len() < column_count {
        results.push(ProbeResult::Error);
    }
}
