//! `nrt run` - probe the fleet and write one run report.

use crate::error::StartupError;
use crate::fleet;
use clap::Args;
use miette::Result;
use nrt_common::config::NrtConfig;
use nrt_common::manifest::{load_destinations, load_sources};
use nrt_common::session::SshTransport;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the `run` subcommand.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Source device manifest (one "<name> <address>" per line)
    #[arg(long, value_name = "PATH")]
    pub sources: Option<PathBuf>,

    /// Fixed destination manifest (one address per line)
    #[arg(long, value_name = "PATH")]
    pub destinations: Option<PathBuf>,

    /// Directory to write the report into
    #[arg(long, value_name = "PATH")]
    pub results_dir: Option<PathBuf>,

    /// Maximum in-flight device sessions
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Skip the warm-up ping before each measured ping
    #[arg(long)]
    pub no_warmup: bool,
}

/// Execute a fleet probe run.
///
/// Manifest and results-directory problems are fatal here, before any
/// session opens; everything after that degrades per device.
pub async fn execute(mut config: NrtConfig, args: RunArgs) -> Result<()> {
    if let Some(path) = args.sources {
        config.report.sources_file = path;
    }
    if let Some(path) = args.destinations {
        config.report.destinations_file = path;
    }
    if let Some(path) = args.results_dir {
        config.report.results_dir = path;
    }
    if let Some(width) = args.concurrency {
        config.probe.concurrency = width;
    }
    if args.no_warmup {
        config.probe.warmup = false;
    }

    let sources =
        load_sources(&config.report.sources_file).map_err(StartupError::from_sources)?;
    if sources.is_empty() {
        return Err(StartupError::NoSources {
            path: config.report.sources_file.clone(),
        }
        .into());
    }

    let destinations = load_destinations(&config.report.destinations_file)
        .map_err(StartupError::from_destinations)?;

    std::fs::create_dir_all(&config.report.results_dir).map_err(|source| {
        StartupError::ResultsDir {
            path: config.report.results_dir.clone(),
            source,
        }
    })?;

    let transport = Arc::new(SshTransport::new(&config.device));
    let summary = fleet::run_fleet_probe(transport, &config, sources, destinations)
        .await
        .map_err(|e| miette::miette!("{e:#}"))?;

    println!("{}", summary.message());
    Ok(())
}
