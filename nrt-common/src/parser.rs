//! Parsing of semi-structured device CLI output.
//!
//! All text scraping of device output lives here, behind small
//! functions with documented patterns, so CLI format drift stays out
//! of the probe and orchestration logic. Three shapes are understood:
//!
//! - the default-route summary (`show ip route 0.0.0.0 | i , from`),
//!   whose first dotted-quad is the resolving next-hop;
//! - the BGP best-path summary (`show ip bgp 0.0.0.0 | i from 1`),
//!   which lists one or more candidate path addresses;
//! - the ping statistics summary (`Success rate is N percent ...`,
//!   optionally followed by `round-trip min/avg/max = a/b/c ms`).

use crate::types::ProbeResult;
use std::sync::LazyLock;
use thiserror::Error;

static IPV4: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}").expect("valid regex"));

static SUCCESS_RATE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"Success rate is (\d+) percent").expect("valid regex"));

static ROUND_TRIP: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"round-trip min/avg/max = (\d+)/(\d+)/(\d+) ms").expect("valid regex")
});

/// Errors raised when device output does not match a known shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The default-route summary carried no resolving address.
    #[error("no resolving address found in default-route output")]
    RouteSummary,

    /// The BGP summary carried no path address differing from the
    /// primary data center.
    #[error("no alternate path found in BGP output (primary is {primary})")]
    BgpSummary { primary: String },

    /// The ping output carried no success-rate summary at all.
    #[error("unrecognized ping output (no success-rate summary)")]
    PingSummary,
}

/// Extract the resolving next-hop address from a default-route query.
///
/// The first dotted-quad in the output wins; routers print the
/// resolving address first on the `from` line the query filters for.
pub fn parse_route_destination(raw: &str) -> Result<String, ParseError> {
    IPV4.find(raw)
        .map(|m| m.as_str().to_string())
        .ok_or(ParseError::RouteSummary)
}

/// Select the secondary data-center address from a BGP best-path query.
///
/// Scans candidate path addresses in output order and returns the
/// first one that differs from `primary`. Addresses are compared
/// trimmed, so incidental whitespace around a match never defeats the
/// filter.
pub fn parse_bgp_secondary(raw: &str, primary: &str) -> Result<String, ParseError> {
    let primary = primary.trim();
    IPV4.find_iter(raw)
        .map(|m| m.as_str().trim())
        .find(|candidate| *candidate != primary)
        .map(str::to_string)
        .ok_or_else(|| ParseError::BgpSummary {
            primary: primary.to_string(),
        })
}

/// Parsed ping statistics: the success percentage and, when the
/// device printed one, the round-trip timing summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingStats {
    pub success_rate: u32,
    pub round_trip: Option<(u32, u32, u32)>,
}

impl PingStats {
    /// Apply the reachability policy: a probe counts as successful
    /// only when the success rate is above zero *and* a timing line
    /// was present. Everything else is `NoReply` — including the
    /// inconsistent case of a positive success rate with no timing
    /// line, which must not be treated as a failure of the run.
    pub fn probe_result(&self) -> ProbeResult {
        match (self.success_rate, self.round_trip) {
            (rate, Some((min, avg, max))) if rate > 0 => ProbeResult::Times { min, avg, max },
            _ => ProbeResult::NoReply,
        }
    }
}

/// Parse the statistics summary of a repeat-count ping.
///
/// A missing timing line is not an error: devices omit it whenever no
/// echo came back, and occasionally even with a positive success
/// rate. Only output without any success-rate line is rejected.
pub fn parse_ping_statistics(raw: &str) -> Result<PingStats, ParseError> {
    let success_rate = SUCCESS_RATE
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .ok_or(ParseError::PingSummary)?;

    let round_trip = ROUND_TRIP.captures(raw).and_then(|c| {
        let min = c.get(1)?.as_str().parse().ok()?;
        let avg = c.get(2)?.as_str().parse().ok()?;
        let max = c.get(3)?.as_str().parse().ok()?;
        Some((min, avg, max))
    });

    Ok(PingStats {
        success_rate,
        round_trip,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::sample;

    #[test]
    fn route_destination_takes_first_address() {
        let raw = "Known via \"bgp 65000\", distance 20, metric 0, candidate default path\n\
                   * 10.1.1.1, from 10.1.1.1, 3w2d ago\n";
        assert_eq!(parse_route_destination(raw).unwrap(), "10.1.1.1");
    }

    #[test]
    fn route_destination_without_address_is_an_error() {
        assert_eq!(
            parse_route_destination("% Network not in table\n"),
            Err(ParseError::RouteSummary)
        );
    }

    #[test]
    fn bgp_secondary_skips_the_primary() {
        let raw = sample::bgp_paths(&["10.1.1.1", "10.2.2.1"]);
        assert_eq!(parse_bgp_secondary(&raw, "10.1.1.1").unwrap(), "10.2.2.1");
    }

    #[test]
    fn bgp_secondary_honors_scan_order() {
        let raw = sample::bgp_paths(&["10.9.9.9", "10.1.1.1", "10.2.2.1"]);
        assert_eq!(parse_bgp_secondary(&raw, "10.1.1.1").unwrap(), "10.9.9.9");
    }

    #[test]
    fn bgp_with_only_the_primary_is_an_error() {
        let raw = sample::bgp_paths(&["10.1.1.1"]);
        assert_eq!(
            parse_bgp_secondary(&raw, "10.1.1.1"),
            Err(ParseError::BgpSummary {
                primary: "10.1.1.1".to_string()
            })
        );
    }

    #[test]
    fn ping_with_replies_yields_numeric_triple() {
        let stats = parse_ping_statistics(&sample::ping_ok(1, 2, 3)).unwrap();
        assert_eq!(stats.success_rate, 100);
        assert_eq!(stats.round_trip, Some((1, 2, 3)));
        assert_eq!(
            stats.probe_result(),
            ProbeResult::Times {
                min: 1,
                avg: 2,
                max: 3
            }
        );
    }

    #[test]
    fn ping_with_zero_success_yields_no_reply() {
        let stats = parse_ping_statistics(&sample::ping_no_reply()).unwrap();
        assert_eq!(stats.success_rate, 0);
        assert_eq!(stats.round_trip, None);
        assert_eq!(stats.probe_result(), ProbeResult::NoReply);
    }

    #[test]
    fn positive_rate_without_timing_line_yields_no_reply() {
        // Some platforms report a nonzero rate yet omit the timing
        // summary; that inconsistency must never panic or count as a
        // measurement.
        let raw = "Sending 5, 100-byte ICMP Echos to 8.8.8.8, timeout is 2 seconds:\n\
                   .!.!.\nSuccess rate is 40 percent (2/5)\n";
        let stats = parse_ping_statistics(raw).unwrap();
        assert_eq!(stats.success_rate, 40);
        assert_eq!(stats.round_trip, None);
        assert_eq!(stats.probe_result(), ProbeResult::NoReply);
    }

    #[test]
    fn ping_without_summary_is_an_error() {
        assert_eq!(
            parse_ping_statistics("% Unrecognized command\n"),
            Err(ParseError::PingSummary)
        );
    }
}
