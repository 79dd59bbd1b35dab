//! Fleet orchestration.
//!
//! Dispatches one probe per source device across a bounded worker
//! pool and writes the run report. Results land in slots indexed by
//! submission order, so the report layout is stable across runs no
//! matter which devices answer first.

pub mod probe;

use crate::report;
use anyhow::{Context, Result};
use chrono::Local;
use nrt_common::config::NrtConfig;
use nrt_common::session::DeviceTransport;
use nrt_common::types::{RunRow, SourceDevice};
use probe::{ProbeOptions, probe_source};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{Instant, timeout_at};
use tracing::{info, warn};

/// Outcome of one fleet run, for the caller's summary line.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Where the report was written.
    pub report_path: PathBuf,
    /// Number of probed source devices (rows in the report).
    pub sources: usize,
    /// Rows carrying at least one `ERROR` cell.
    pub error_rows: usize,
}

impl RunSummary {
    /// Human-readable one-liner for the gateway/status layer.
    pub fn message(&self) -> String {
        format!(
            "Probed {} devices into {} ({} with errors)",
            self.sources,
            self.report_path.display(),
            self.error_rows
        )
    }
}

/// Probe every source device and write one CSV run report.
///
/// Per-device failures become `ERROR` cells; only report I/O and
/// worker-pool plumbing can fail the run itself. The report directory
/// must already exist.
pub async fn run_fleet_probe<T>(
    transport: Arc<T>,
    config: &NrtConfig,
    sources: Vec<SourceDevice>,
    destinations: Vec<String>,
) -> Result<RunSummary>
where
    T: DeviceTransport + 'static,
{
    let report_path = config
        .report
        .results_dir
        .join(report::report_filename(&Local::now()));

    let column_count = 2 + destinations.len();
    let options = ProbeOptions::from(&config.probe);
    let destinations = Arc::new(destinations);
    let semaphore = Arc::new(Semaphore::new(config.probe.concurrency.max(1)));
    let deadline = config
        .probe
        .run_deadline_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));

    info!(
        sources = sources.len(),
        destinations = destinations.len(),
        concurrency = config.probe.concurrency,
        "starting fleet probe"
    );

    // Submission queues on the semaphore: at most `concurrency`
    // probes are in flight, the rest wait their turn here.
    let mut handles = Vec::with_capacity(sources.len());
    for source in sources.iter().cloned() {
        let permit = match deadline {
            Some(at) => match timeout_at(at, semaphore.clone().acquire_owned()).await {
                Ok(permit) => permit.context("worker pool closed")?,
                Err(_) => {
                    warn!(device = %source, "run deadline reached before submission");
                    break;
                }
            },
            None => semaphore
                .clone()
                .acquire_owned()
                .await
                .context("worker pool closed")?,
        };

        let transport = transport.clone();
        let destinations = destinations.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permit;
            probe_source(transport.as_ref(), &source, &destinations, options).await
        }));
    }

    // Slots are indexed by submission order; completion order never
    // influences the report layout.
    let mut rows: Vec<Option<RunRow>> = sources.iter().map(|_| None).collect();
    for (idx, mut handle) in handles.into_iter().enumerate() {
        let row = match deadline {
            Some(at) => match timeout_at(at, &mut handle).await {
                Ok(joined) => joined.context("probe task panicked")?,
                Err(_) => {
                    handle.abort();
                    warn!(device = %sources[idx], "run deadline reached, probe abandoned");
                    RunRow::all_errors(sources[idx].clone(), column_count)
                }
            },
            None => handle.await.context("probe task panicked")?,
        };
        rows[idx] = Some(row);
    }

    // Sources never submitted (deadline hit first) still get a row.
    let rows: Vec<RunRow> = rows
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| {
            slot.unwrap_or_else(|| RunRow::all_errors(sources[idx].clone(), column_count))
        })
        .collect();

    report::write_report(&report_path, &destinations, &rows)
        .with_context(|| format!("failed to write report {}", report_path.display()))?;

    let error_rows = rows.iter().filter(|row| row.error_count() > 0).count();
    info!(
        report = %report_path.display(),
        rows = rows.len(),
        error_rows,
        "fleet probe complete"
    );

    Ok(RunSummary {
        report_path,
        sources: rows.len(),
        error_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nrt_common::config::NrtConfig;
    use nrt_common::mock::{MockDevice, MockFleet};

    fn fleet_config(results_dir: &std::path::Path) -> NrtConfig {
        let mut config = NrtConfig::default();
        config.report.results_dir = results_dir.to_path_buf();
        config.probe.warmup = false;
        config
    }

    fn sources(addresses: &[(&str, &str)]) -> Vec<SourceDevice> {
        addresses
            .iter()
            .map(|(name, addr)| SourceDevice::new(*name, *addr))
            .collect()
    }

    #[tokio::test]
    async fn rows_follow_submission_order_not_completion_order() {
        let dir = tempfile::tempdir().unwrap();
        // The first device is slow; its row must still come first.
        let fleet = MockFleet::new()
            .device(
                "10.0.0.1",
                MockDevice::healthy("10.1.1.1", "10.2.2.1", 9, 9, 9)
                    .with_delay(Duration::from_millis(80)),
            )
            .device(
                "10.0.0.2",
                MockDevice::healthy("10.1.1.1", "10.2.2.1", 1, 1, 1),
            );

        let summary = run_fleet_probe(
            Arc::new(fleet),
            &fleet_config(dir.path()),
            sources(&[("slow", "10.0.0.1"), ("fast", "10.0.0.2")]),
            vec![],
        )
        .await
        .unwrap();

        let content = std::fs::read_to_string(&summary.report_path).unwrap();
        let data_rows: Vec<&str> = content.lines().skip(1).collect();
        assert!(data_rows[0].starts_with("slow,10.0.0.1"));
        assert!(data_rows[1].starts_with("fast,10.0.0.2"));
    }

    #[tokio::test]
    async fn one_unreachable_device_does_not_poison_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let fleet = MockFleet::new()
            .device("10.0.0.1", MockDevice::unreachable("connection refused"))
            .device(
                "10.0.0.2",
                MockDevice::healthy("10.1.1.1", "10.2.2.1", 1, 2, 3),
            );

        let summary = run_fleet_probe(
            Arc::new(fleet),
            &fleet_config(dir.path()),
            sources(&[("down", "10.0.0.1"), ("up", "10.0.0.2")]),
            vec!["8.8.8.8".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(summary.sources, 2);
        assert_eq!(summary.error_rows, 1);

        let content = std::fs::read_to_string(&summary.report_path).unwrap();
        let data_rows: Vec<&str> = content.lines().skip(1).collect();
        assert_eq!(data_rows[0], "down,10.0.0.1,ERROR,ERROR,ERROR,ERROR,ERROR,ERROR,ERROR,ERROR,ERROR");
        assert_eq!(data_rows[1], "up,10.0.0.2,1,2,3,1,2,3,1,2,3");
    }

    #[tokio::test(start_paused = true)]
    async fn run_deadline_turns_stragglers_into_error_rows() {
        let dir = tempfile::tempdir().unwrap();
        let fleet = MockFleet::new().device(
            "10.0.0.1",
            MockDevice::healthy("10.1.1.1", "10.2.2.1", 1, 2, 3)
                .with_delay(Duration::from_secs(600)),
        );

        let mut config = fleet_config(dir.path());
        config.probe.run_deadline_secs = Some(5);

        let summary = run_fleet_probe(
            Arc::new(fleet),
            &config,
            sources(&[("stuck", "10.0.0.1")]),
            vec![],
        )
        .await
        .unwrap();

        assert_eq!(summary.error_rows, 1);
        let content = std::fs::read_to_string(&summary.report_path).unwrap();
        let row = content.lines().nth(1).unwrap();
        assert_eq!(row, "stuck,10.0.0.1,ERROR,ERROR,ERROR,ERROR,ERROR,ERROR");
    }

    #[tokio::test]
    async fn every_row_has_fixed_arity() {
        let dir = tempfile::tempdir().unwrap();
        let fleet = MockFleet::new()
            .device(
                "10.0.0.1",
                MockDevice::healthy("10.1.1.1", "10.2.2.1", 1, 2, 3),
            )
            .device("10.0.0.2", MockDevice::unreachable("refused"));

        let destinations = vec!["8.8.8.8".to_string(), "1.1.1.1".to_string()];
        let summary = run_fleet_probe(
            Arc::new(fleet),
            &fleet_config(dir.path()),
            sources(&[("a", "10.0.0.1"), ("b", "10.0.0.2")]),
            destinations.clone(),
        )
        .await
        .unwrap();

        let mut reader = csv::Reader::from_path(&summary.report_path).unwrap();
        let expected_cells = 2 + (2 + destinations.len()) * 3;
        for record in reader.records() {
            assert_eq!(record.unwrap().len(), expected_cells);
        }
    }

    #[tokio::test]
    async fn error_rows_never_contain_numeric_or_null_cells() {
        let dir = tempfile::tempdir().unwrap();
        let fleet = MockFleet::new().device("10.0.0.1", MockDevice::unreachable("refused"));

        let summary = run_fleet_probe(
            Arc::new(fleet),
            &fleet_config(dir.path()),
            sources(&[("down", "10.0.0.1")]),
            vec!["8.8.8.8".to_string()],
        )
        .await
        .unwrap();

        let content = std::fs::read_to_string(&summary.report_path).unwrap();
        let row = content.lines().nth(1).unwrap();
        let cells: Vec<&str> = row.split(',').skip(2).collect();
        assert!(cells.iter().all(|c| *c == "ERROR"));
    }

    #[test]
    fn summary_message_names_files_and_errors() {
        let summary = RunSummary {
            report_path: PathBuf::from("net_tests/NT080620251200.csv"),
            sources: 12,
            error_rows: 2,
        };
        let message = summary.message();
        assert!(message.contains("12 devices"));
        assert!(message.contains("NT080620251200.csv"));
        assert!(message.contains("2 with errors"));
    }
}
