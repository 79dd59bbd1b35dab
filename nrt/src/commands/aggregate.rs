//! `nrt aggregate` - fold a directory of run reports into a daily
//! summary.

use crate::aggregate::aggregate_directory;
use crate::error::StartupError;
use chrono::{Local, NaiveDate};
use clap::Args;
use miette::Result;
use nrt_common::config::NrtConfig;
use std::path::PathBuf;

/// Arguments for the `aggregate` subcommand.
#[derive(Debug, Args)]
pub struct AggregateArgs {
    /// Directory of run reports (defaults to the results directory)
    #[arg(long, value_name = "PATH")]
    pub dir: Option<PathBuf>,

    /// Aggregation date stamped into the output name (YYYY-MM-DD,
    /// defaults to today)
    #[arg(long, value_name = "DATE")]
    pub date: Option<NaiveDate>,
}

/// Execute an aggregation pass.
pub async fn execute(config: NrtConfig, args: AggregateArgs) -> Result<()> {
    let dir = args.dir.unwrap_or(config.report.results_dir);
    if !dir.is_dir() {
        return Err(StartupError::ReportsDirNotFound { path: dir }.into());
    }

    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let summary = aggregate_directory(&dir, date).map_err(|e| miette::miette!("{e:#}"))?;

    println!("{}", summary.message());
    Ok(())
}
