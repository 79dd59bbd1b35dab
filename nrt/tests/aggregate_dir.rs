//! Aggregator tests over handcrafted report directories.

use chrono::NaiveDate;
use nrt::aggregate::aggregate_directory;
use std::path::Path;

const HEADER: &str = "Source-IP,Name,Primary-DC-min,Primary-DC-max,Primary-DC-avg,\
                      Secondary-DC-min,Secondary-DC-max,Secondary-DC-avg,\
                      8.8.8.8-min,8.8.8.8-avg,8.8.8.8-max";

fn write_report(dir: &Path, name: &str, rows: &[&str]) {
    let mut content = String::from(HEADER);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    std::fs::write(dir.join(name), content).unwrap();
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
}

fn aggregate_lines(dir: &Path) -> Vec<String> {
    let summary = aggregate_directory(dir, date()).unwrap();
    std::fs::read_to_string(&summary.output_path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn two_files_fold_into_min_max_and_mean() {
    let dir = tempfile::tempdir().unwrap();
    write_report(
        dir.path(),
        "NT010120260900.csv",
        &["edge1,10.0.0.1,1,2,3,None,None,None,1,2,3"],
    );
    write_report(
        dir.path(),
        "NT010220260900.csv",
        &["edge2,10.0.0.2,5,7,9,None,None,None,5,7,9"],
    );

    let lines = aggregate_lines(dir.path());
    assert_eq!(lines[0], "Destination,Min Time,Avg Time,Max Time");
    assert_eq!(lines[1], "Primary-DC,1,4.5,9");
    // Only null triples were seen for the secondary path.
    assert_eq!(lines[2], "Secondary-DC,None,None,None");
    assert_eq!(lines[3], "8.8.8.8,1,4.5,9");
    assert_eq!(lines.len(), 4);
}

#[test]
fn error_triples_contribute_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_report(
        dir.path(),
        "NT010120260900.csv",
        &[
            "edge1,10.0.0.1,1,2,3,ERROR,ERROR,ERROR,ERROR,ERROR,ERROR",
            "edge2,10.0.0.2,ERROR,ERROR,ERROR,ERROR,ERROR,ERROR,5,7,9",
        ],
    );

    let lines = aggregate_lines(dir.path());
    assert_eq!(lines[1], "Primary-DC,1,2,3");
    assert_eq!(lines[2], "Secondary-DC,None,None,None");
    assert_eq!(lines[3], "8.8.8.8,5,7,9");
}

#[test]
fn file_order_does_not_change_the_summary() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    let rows_a = "edge1,10.0.0.1,1,2,3,1,2,3,1,2,3";
    let rows_b = "edge2,10.0.0.2,5,7,9,5,7,9,5,7,9";

    // Same rows, swapped across differently-named files so the scan
    // visits them in opposite order.
    write_report(first.path(), "NT010120260900.csv", &[rows_a]);
    write_report(first.path(), "NT010220260900.csv", &[rows_b]);
    write_report(second.path(), "NT010120260900.csv", &[rows_b]);
    write_report(second.path(), "NT010220260900.csv", &[rows_a]);

    assert_eq!(aggregate_lines(first.path()), aggregate_lines(second.path()));
}

#[test]
fn rerunning_over_an_unchanged_directory_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_report(
        dir.path(),
        "NT010120260900.csv",
        &["edge1,10.0.0.1,1,2,3,1,2,3,4,5,6"],
    );

    let first = aggregate_lines(dir.path());
    // The first pass wrote its own output file into the directory;
    // the second pass must not pick it up as input.
    let second = aggregate_lines(dir.path());
    assert_eq!(first, second);
}

#[test]
fn only_report_named_files_are_scanned() {
    let dir = tempfile::tempdir().unwrap();
    write_report(
        dir.path(),
        "NT010120260900.csv",
        &["edge1,10.0.0.1,1,2,3,1,2,3,1,2,3"],
    );
    // Close but wrong names: too few digits, stray suffix, notes file.
    write_report(
        dir.path(),
        "NT0101202609.csv",
        &["edge9,10.9.9.9,900,900,900,900,900,900,900,900,900"],
    );
    std::fs::write(dir.path().join("notes.txt"), "not a report").unwrap();

    let summary = aggregate_directory(dir.path(), date()).unwrap();
    assert_eq!(summary.file_count, 1);

    let lines = aggregate_lines(dir.path());
    assert_eq!(lines[1], "Primary-DC,1,2,3");
}

#[test]
fn empty_directory_still_writes_a_summary() {
    let dir = tempfile::tempdir().unwrap();
    let summary = aggregate_directory(dir.path(), date()).unwrap();
    assert_eq!(summary.file_count, 0);
    assert_eq!(summary.destinations, 0);
    assert_eq!(
        summary
            .output_path
            .file_name()
            .unwrap()
            .to_str()
            .unwrap(),
        "daily_aggregate_20260806.csv"
    );

    let content = std::fs::read_to_string(&summary.output_path).unwrap();
    assert_eq!(content.trim_end(), "Destination,Min Time,Avg Time,Max Time");
}

#[test]
fn missing_directory_is_a_hard_error() {
    assert!(aggregate_directory(Path::new("/no/such/reports"), date()).is_err());
}
