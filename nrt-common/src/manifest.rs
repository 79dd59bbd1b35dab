//! Source and destination manifest loading.
//!
//! Manifests are plain UTF-8 text, one entry per line, tolerant of a
//! leading byte-order mark (exports from Windows tooling carry one).
//! Source lines are `"<name> <address>"`; destination lines are a
//! bare address. Blank lines are skipped.

use crate::types::SourceDevice;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a manifest file.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read manifest {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed source entry at {path}:{line_no}: {line:?} (expected \"<name> <address>\")")]
    MalformedSource {
        path: PathBuf,
        line_no: usize,
        line: String,
    },
}

fn read_lines(path: &Path) -> Result<Vec<(usize, String)>, ManifestError> {
    if !path.exists() {
        return Err(ManifestError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    Ok(content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim().to_string()))
        .filter(|(_, line)| !line.is_empty())
        .collect())
}

/// Load the source device manifest.
pub fn load_sources(path: &Path) -> Result<Vec<SourceDevice>, ManifestError> {
    read_lines(path)?
        .into_iter()
        .map(|(line_no, line)| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(name), Some(address), None) => Ok(SourceDevice::new(name, address)),
                _ => Err(ManifestError::MalformedSource {
                    path: path.to_path_buf(),
                    line_no,
                    line,
                }),
            }
        })
        .collect()
}

/// Load the fixed destination manifest.
pub fn load_destinations(path: &Path) -> Result<Vec<String>, ManifestError> {
    Ok(read_lines(path)?.into_iter().map(|(_, line)| line).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_manifest(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn sources_parse_name_and_address() {
        let (_dir, path) = write_manifest("edge1 10.0.0.1\nedge2 10.0.0.2\n");
        let sources = load_sources(&path).unwrap();
        assert_eq!(
            sources,
            vec![
                SourceDevice::new("edge1", "10.0.0.1"),
                SourceDevice::new("edge2", "10.0.0.2"),
            ]
        );
    }

    #[test]
    fn leading_bom_is_stripped() {
        let (_dir, path) = write_manifest("\u{feff}edge1 10.0.0.1\n");
        let sources = load_sources(&path).unwrap();
        assert_eq!(sources[0].name, "edge1");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let (_dir, path) = write_manifest("8.8.8.8\n\n  \n1.1.1.1\n");
        let destinations = load_destinations(&path).unwrap();
        assert_eq!(destinations, vec!["8.8.8.8", "1.1.1.1"]);
    }

    #[test]
    fn destination_order_follows_the_file() {
        let (_dir, path) = write_manifest("1.1.1.1\n8.8.8.8\n9.9.9.9\n");
        let destinations = load_destinations(&path).unwrap();
        assert_eq!(destinations, vec!["1.1.1.1", "8.8.8.8", "9.9.9.9"]);
    }

    #[test]
    fn malformed_source_line_reports_position() {
        let (_dir, path) = write_manifest("edge1 10.0.0.1\njust-a-name\n");
        let err = load_sources(&path).unwrap_err();
        match err {
            ManifestError::MalformedSource { line_no, line, .. } => {
                assert_eq!(line_no, 2);
                assert_eq!(line, "just-a-name");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let err = load_sources(Path::new("/no/such/manifest.txt")).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound { .. }));
    }
}
