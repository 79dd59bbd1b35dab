//! Network Reachability Tester - CLI entry point.
//!
//! Probes a fleet of WAN devices over SSH for reachability and
//! latency toward their data centers and a fixed destination set,
//! then aggregates historical reports into daily summaries.

#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use miette::Result;
use nrt::commands::aggregate::AggregateArgs;
use nrt::commands::run::RunArgs;
use nrt::error::StartupError;
use nrt_common::{LogConfig, init_logging, load_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nrt")]
#[command(
    author,
    version,
    about = "Network Reachability Tester - fleet latency probing over SSH",
    long_about = "NRT logs into every WAN device in a manifest, discovers the primary and \
                  secondary data-center paths each device currently routes through, pings a \
                  fixed destination set, and writes one CSV report per run. A separate \
                  aggregation pass folds a directory of reports into a daily min/avg/max \
                  summary per destination.",
    after_help = r#"EXAMPLES:
    # Probe the fleet using ./nrt.toml and the default manifests
    nrt run

    # Probe with explicit manifests and a wider pool
    nrt run --sources office_wan_devices.txt --destinations test_destinations.txt --concurrency 32

    # Fold yesterday's reports into a daily summary
    nrt aggregate --dir net_tests --date 2026-08-05

ENVIRONMENT VARIABLES:
    NRT_LOG_LEVEL     Logging level: trace, debug, info, warn, error, off
    NRT_LOG_FORMAT    Log format: pretty, json, compact
    NRT_LOG_FILE      Path to a daily-rolling log file
    NRT_USERNAME      Device CLI username
    NRT_PASSWORD      Device CLI password (opaque to the SSH transport)
    NRT_IDENTITY_FILE SSH identity file for device access
    NRT_PORT          Device SSH port
    NRT_CONCURRENCY   Maximum in-flight device sessions
    NRT_RESULTS_DIR   Report directory

CONFIG PRECEDENCE (highest to lowest):
    1. Command-line arguments
    2. NRT_* environment variables
    3. --config <file>, or ./nrt.toml, or the user config file
    4. Built-in defaults"#
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Explicit config file path
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe every source device and write one run report
    Run(RunArgs),
    /// Fold a directory of run reports into a daily summary
    Aggregate(AggregateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let _guards = init_logging(&LogConfig::from_env(level))
        .map_err(|e| miette::miette!("failed to initialize logging: {e:#}"))?;

    let config = load_config(cli.config.as_deref()).map_err(|e| StartupError::ConfigInvalid {
        message: e.to_string(),
    })?;

    match cli.command {
        Commands::Run(args) => nrt::commands::run::execute(config, args).await,
        Commands::Aggregate(args) => nrt::commands::aggregate::execute(config, args).await,
    }
}
