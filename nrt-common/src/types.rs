//! Common types shared across NRT components.

use serde::{Deserialize, Serialize};

/// Column label of the dynamically discovered primary data center.
pub const PRIMARY_DC: &str = "Primary-DC";

/// Column label of the dynamically discovered secondary data center.
pub const SECONDARY_DC: &str = "Secondary-DC";

/// One probed network device, loaded from the source manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDevice {
    /// Human-readable device name.
    pub name: String,
    /// Management address the session connects to.
    pub address: String,
}

impl SourceDevice {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

impl std::fmt::Display for SourceDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// Label identifying one destination column in a report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DestinationLabel(pub String);

impl DestinationLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DestinationLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Full column label order for a run: the two discovered data centers
/// followed by the fixed destinations in manifest order.
pub fn destination_labels(fixed: &[String]) -> Vec<DestinationLabel> {
    let mut labels = Vec::with_capacity(2 + fixed.len());
    labels.push(DestinationLabel::new(PRIMARY_DC));
    labels.push(DestinationLabel::new(SECONDARY_DC));
    labels.extend(fixed.iter().map(DestinationLabel::new));
    labels
}

/// Outcome of probing one destination from one source device.
///
/// The three states stay distinguishable all the way into the CSV and
/// back out through the aggregator:
/// - `Times` is a numeric round-trip triple in milliseconds;
/// - `NoReply` means the device answered but zero echoes came back
///   (cells are the literal string `None`);
/// - `Error` means the session or command itself failed (cells are
///   the literal string `ERROR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeResult {
    Times { min: u32, avg: u32, max: u32 },
    NoReply,
    Error,
}

/// Cell text for a probe with no successful replies.
const NO_REPLY_CELL: &str = "None";

/// Cell text for a session/command failure.
const ERROR_CELL: &str = "ERROR";

impl ProbeResult {
    /// The three CSV cells for this result, in (min, avg, max) order.
    pub fn cells(&self) -> [String; 3] {
        match self {
            ProbeResult::Times { min, avg, max } => {
                [min.to_string(), avg.to_string(), max.to_string()]
            }
            ProbeResult::NoReply => std::array::from_fn(|_| NO_REPLY_CELL.to_string()),
            ProbeResult::Error => std::array::from_fn(|_| ERROR_CELL.to_string()),
        }
    }

    /// Reconstruct a result from three report cells.
    ///
    /// Returns `None` for cells that are neither a numeric triple nor
    /// one of the sentinel forms; callers treat those as unusable and
    /// skip them.
    pub fn from_cells(min: &str, avg: &str, max: &str) -> Option<Self> {
        let cells = [min.trim(), avg.trim(), max.trim()];
        if cells.iter().all(|c| *c == ERROR_CELL) {
            return Some(ProbeResult::Error);
        }
        if cells.iter().all(|c| *c == NO_REPLY_CELL || c.is_empty()) {
            return Some(ProbeResult::NoReply);
        }
        match (
            cells[0].parse::<u32>(),
            cells[1].parse::<u32>(),
            cells[2].parse::<u32>(),
        ) {
            (Ok(min), Ok(avg), Ok(max)) => Some(ProbeResult::Times { min, avg, max }),
            _ => None,
        }
    }

    /// True when this result carries measurable timing data.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ProbeResult::Times { .. })
    }
}

/// One report row: a source device plus its probe results in column
/// order (Primary-DC, Secondary-DC, fixed destinations).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRow {
    pub source: SourceDevice,
    pub results: Vec<ProbeResult>,
}

impl RunRow {
    /// A row where every destination carries the error sentinel, used
    /// when the device session failed before any probe completed.
    pub fn all_errors(source: SourceDevice, destination_count: usize) -> Self {
        Self {
            source,
            results: vec![ProbeResult::Error; destination_count],
        }
    }

    /// Count of results carrying the error sentinel.
    pub fn error_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r, ProbeResult::Error))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_keep_manifest_order() {
        let fixed = vec!["8.8.8.8".to_string(), "1.1.1.1".to_string()];
        let labels = destination_labels(&fixed);
        assert_eq!(labels.len(), 4);
        assert_eq!(labels[0].as_str(), PRIMARY_DC);
        assert_eq!(labels[1].as_str(), SECONDARY_DC);
        assert_eq!(labels[2].as_str(), "8.8.8.8");
        assert_eq!(labels[3].as_str(), "1.1.1.1");
    }

    #[test]
    fn numeric_cells_round_trip() {
        let result = ProbeResult::Times {
            min: 1,
            avg: 2,
            max: 3,
        };
        let cells = result.cells();
        assert_eq!(cells, ["1", "2", "3"].map(String::from));
        assert_eq!(
            ProbeResult::from_cells(&cells[0], &cells[1], &cells[2]),
            Some(result)
        );
    }

    #[test]
    fn sentinel_cells_stay_distinguishable() {
        assert_eq!(
            ProbeResult::from_cells("ERROR", "ERROR", "ERROR"),
            Some(ProbeResult::Error)
        );
        assert_eq!(
            ProbeResult::from_cells("None", "None", "None"),
            Some(ProbeResult::NoReply)
        );
        assert_ne!(
            ProbeResult::from_cells("ERROR", "ERROR", "ERROR"),
            ProbeResult::from_cells("None", "None", "None")
        );
    }

    #[test]
    fn garbage_cells_are_rejected() {
        assert_eq!(ProbeResult::from_cells("1", "two", "3"), None);
        assert_eq!(ProbeResult::from_cells("ERROR", "None", "3"), None);
    }

    #[test]
    fn all_errors_row_has_requested_arity() {
        let row = RunRow::all_errors(SourceDevice::new("edge1", "10.0.0.1"), 5);
        assert_eq!(row.results.len(), 5);
        assert_eq!(row.error_count(), 5);
        assert!(row.results.iter().all(|r| *r == ProbeResult::Error));
    }
}
