//! Run report CSV layout and writing.
//!
//! One report per fleet run, named `NT<MM><DD><YYYY><HHMM>.csv`. The
//! header names the two source columns and a min/avg/max group per
//! destination; data rows carry one device each, with sentinel cells
//! (`None`, `ERROR`) where no measurement exists.

use anyhow::Result;
use chrono::{DateTime, Local};
use nrt_common::types::{RunRow, destination_labels};
use std::path::Path;

/// Timestamp-derived report file name (test ID plus extension).
pub fn report_filename(now: &DateTime<Local>) -> String {
    now.format("NT%m%d%Y%H%M.csv").to_string()
}

/// Header row for a run report.
///
/// The two data-center groups keep their historical min,max,avg label
/// order while cells are always written min,avg,max; consumers read
/// the triples positionally, and existing tooling depends on these
/// exact labels.
pub fn report_header(destinations: &[String]) -> Vec<String> {
    let mut header = vec!["Source-IP".to_string(), "Name".to_string()];
    for (idx, label) in destination_labels(destinations).iter().enumerate() {
        let suffixes = if idx < 2 {
            ["min", "max", "avg"]
        } else {
            ["min", "avg", "max"]
        };
        for suffix in suffixes {
            header.push(format!("{label}-{suffix}"));
        }
    }
    header
}

/// Write a complete run report: header first, then one row per source
/// device in the order given.
pub fn write_report(path: &Path, destinations: &[String], rows: &[RunRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(report_header(destinations))?;

    for row in rows {
        let mut record = Vec::with_capacity(2 + row.results.len() * 3);
        record.push(row.source.name.clone());
        record.push(row.source.address.clone());
        for result in &row.results {
            record.extend(result.cells());
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
