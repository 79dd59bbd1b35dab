//! Daily aggregation of run reports.
//!
//! Folds every run report in a directory into one min/avg/max summary
//! per destination. The scan is read-only and idempotent: the same
//! directory always produces the same summary, and the output file
//! never matches the report naming pattern, so re-running cannot feed
//! the aggregate back into itself.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use nrt_common::types::{DestinationLabel, ProbeResult};

/// Run report naming pattern: `NT` + MMDDYYYYHHMM + `.csv`.
static REPORT_FILE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^NT\d{12}\.csv$").expect("valid regex"));

/// Running aggregate for one destination label.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateEntry {
    /// Destination column label.
    pub label: DestinationLabel,
    /// Lowest minimum seen, if any numeric sample was.
    pub min: Option<u32>,
    /// Highest maximum seen.
    pub max: Option<u32>,
    /// Count of numeric samples folded in.
    pub samples: usize,
    avg_sum: u64,
}

impl AggregateEntry {
    fn new(label: DestinationLabel) -> Self {
        Self {
            label,
            min: None,
            max: None,
            samples: 0,
            avg_sum: 0,
        }
    }

    /// Fold one numeric triple in. Minimum and maximum only ever
    /// tighten; the average accumulates for the final division.
    fn fold(&mut self, min: u32, avg: u32, max: u32) {
        self.min = Some(self.min.map_or(min, |m| m.min(min)));
        self.max = Some(self.max.map_or(max, |m| m.max(max)));
        self.avg_sum += u64::from(avg);
        self.samples += 1;
    }

    /// Mean of the folded per-run averages; `None` with no samples.
    pub fn avg(&self) -> Option<f64> {
        if self.samples == 0 {
            return None;
        }
        Some(self.avg_sum as f64 / self.samples as f64)
    }
}

/// Outcome of one aggregation pass.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateSummary {
    /// Where the daily summary was written.
    pub output_path: PathBuf,
    /// How many run reports contributed.
    pub file_count: usize,
    /// How many destination labels were seen.
    pub destinations: usize,
}

impl AggregateSummary {
    /// Human-readable one-liner for the gateway/status layer.
    pub fn message(&self) -> String {
        format!(
            "Aggregated data from {} files into {}",
            self.file_count,
            self.output_path.display()
        )
    }
}

/// Fold every run report in `dir` into `daily_aggregate_<YYYYMMDD>.csv`.
pub fn aggregate_directory(dir: &Path, date: NaiveDate) -> Result<AggregateSummary> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read report directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| REPORT_FILE.is_match(name))
        })
        .collect();
    files.sort();

    let mut entries: Vec<AggregateEntry> = Vec::new();
    for file in &files {
        fold_report(file, &mut entries)
            .with_context(|| format!("failed to read report {}", file.display()))?;
    }

    let output_path = dir.join(format!("daily_aggregate_{}.csv", date.format("%Y%m%d")));
    write_aggregate(&output_path, &entries)?;

    info!(
        files = files.len(),
        destinations = entries.len(),
        output = %output_path.display(),
        "aggregation complete"
    );

    Ok(AggregateSummary {
        output_path,
        file_count: files.len(),
        destinations: entries.len(),
    })
}

/// Fold one report file into the running entries.
///
/// The destination layout is recovered from the file's own header:
/// two source columns, then one three-cell group per destination,
/// labeled by its `-min` column. Triples are read positionally as
/// (min, avg, max). Rows with unexpected arity and cells that are
/// neither numeric nor a known sentinel are skipped.
fn fold_report(path: &Path, entries: &mut Vec<AggregateEntry>) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut records = reader.records();
    let Some(header) = records.next().transpose()? else {
        warn!(file = %path.display(), "empty report file");
        return Ok(());
    };

    let labels: Vec<String> = header
        .iter()
        .skip(2)
        .step_by(3)
        .map(|cell| cell.strip_suffix("-min").unwrap_or(cell).to_string())
        .collect();

    // Every label appears in the summary even if it never folds a
    // numeric sample.
    for label in &labels {
        entry_index(entries, label);
    }

    let expected_cells = 2 + labels.len() * 3;
    for record in records {
        let record = record?;
        if record.len() != expected_cells {
            warn!(
                file = %path.display(),
                cells = record.len(),
                expected_cells,
                "skipping report row with unexpected arity"
            );
            continue;
        }

        for (group, label) in labels.iter().enumerate() {
            let base = 2 + group * 3;
            let parsed =
                ProbeResult::from_cells(&record[base], &record[base + 1], &record[base + 2]);
            match parsed {
                Some(ProbeResult::Times { min, avg, max }) => {
                    let idx = entry_index(entries, label);
                    entries[idx].fold(min, avg, max);
                }
                Some(_) => {} // sentinel triples carry no timing data
                None => {
                    debug!(file = %path.display(), label, "unreadable triple skipped");
                }
            }
        }
    }

    Ok(())
}

/// Index of the entry for `label`, appending in first-encountered
/// order when new.
fn entry_index(entries: &mut Vec<AggregateEntry>, label: &str) -> usize {
    if let Some(idx) = entries.iter().position(|e| e.label.as_str() == label) {
        return idx;
    }
    entries.push(AggregateEntry::new(DestinationLabel::new(label)));
    entries.len() - 1
}

fn write_aggregate(path: &Path, entries: &[AggregateEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Destination", "Min Time", "Avg Time", "Max Time"])?;

    for entry in entries {
        writer.write_record([
            entry.label.to_string(),
            cell(entry.min.map(|v| v.to_string())),
            cell(entry.avg().map(|v| v.to_string())),
            cell(entry.max.map(|v| v.to_string())),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn cell(value: Option<String>) -> String {
    value.unwrap_or_else(|| "None".to_string())
}
