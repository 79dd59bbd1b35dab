//! Rich startup diagnostics.
//!
//! Per-device failures never surface here; they become `ERROR` cells
//! in the report. Only startup-level problems — missing manifests,
//! broken configuration, an unusable results directory — are fatal,
//! and they carry `NRT-Exxx` codes with actionable help text.

use miette::Diagnostic;
use nrt_common::ManifestError;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors raised before any device is probed.
#[derive(Debug, Error, Diagnostic)]
pub enum StartupError {
    /// The source device manifest is missing.
    #[error("source manifest not found: {path}")]
    #[diagnostic(
        code("NRT-E001"),
        help("Create the manifest with one \"<name> <address>\" line per WAN device")
    )]
    SourcesNotFound { path: PathBuf },

    /// The fixed destination manifest is missing.
    #[error("destination manifest not found: {path}")]
    #[diagnostic(
        code("NRT-E002"),
        help("Create the manifest with one destination address per line")
    )]
    DestinationsNotFound { path: PathBuf },

    /// A manifest exists but could not be used.
    #[error("{message}")]
    #[diagnostic(
        code("NRT-E003"),
        help("Source lines are \"<name> <address>\"; destination lines are a bare address")
    )]
    ManifestInvalid { message: String },

    /// Configuration file problems.
    #[error("invalid configuration: {message}")]
    #[diagnostic(code("NRT-E004"), help("Check the TOML syntax in your nrt.toml"))]
    ConfigInvalid { message: String },

    /// The source manifest loaded but named no devices.
    #[error("no source devices in {path}")]
    #[diagnostic(
        code("NRT-E005"),
        help("The fleet manifest is empty; add at least one device line")
    )]
    NoSources { path: PathBuf },

    /// The results directory could not be created.
    #[error("cannot create results directory {path}")]
    #[diagnostic(code("NRT-E006"), help("Check permissions on the results directory"))]
    ResultsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Aggregation was pointed at a directory that does not exist.
    #[error("report directory not found: {path}")]
    #[diagnostic(
        code("NRT-E007"),
        help("Run a fleet probe first, or point --dir at an existing report directory")
    )]
    ReportsDirNotFound { path: PathBuf },
}

impl StartupError {
    /// Classify a source-manifest loading failure.
    pub fn from_sources(err: ManifestError) -> Self {
        match err {
            ManifestError::NotFound { path } => StartupError::SourcesNotFound { path },
            other => StartupError::ManifestInvalid {
                message: other.to_string(),
            },
        }
    }

    /// Classify a destination-manifest loading failure.
    pub fn from_destinations(err: ManifestError) -> Self {
        match err {
            ManifestError::NotFound { path } => StartupError::DestinationsNotFound { path },
            other => StartupError::ManifestInvalid {
                message: other.to_string(),
            },
        }
    }
}
