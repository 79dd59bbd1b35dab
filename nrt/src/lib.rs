//! Network Reachability Tester - fleet probing and report aggregation.
//!
//! The library surface exposes the two operations the status gateway
//! drives: running a fleet probe ([`fleet::run_fleet_probe`]) and
//! folding a directory of run reports into a daily summary
//! ([`aggregate::aggregate_directory`]). The `nrt` binary wraps these
//! as CLI subcommands.

#![deny(unsafe_code)]

pub mod aggregate;
pub mod commands;
pub mod error;
pub mod fleet;
pub mod report;
