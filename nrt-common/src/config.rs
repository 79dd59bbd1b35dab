//! Configuration loading for NRT.
//!
//! One [`NrtConfig`] is built at startup and passed down; nothing
//! reads configuration at module scope. Precedence, highest first:
//! an explicit `--config` path, the project-local `nrt.toml`, the
//! user config file, built-in defaults — then `NRT_*` environment
//! variables on top.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while locating or parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config in {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NrtConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Credentials and session parameters for device access.
///
/// Everything here is injected; the probing code never hardcodes a
/// credential or timeout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// CLI username on the devices.
    #[serde(default = "default_username")]
    pub username: String,
    /// CLI password, carried opaquely for transports that use it.
    #[serde(default)]
    pub password: Option<String>,
    /// SSH identity file; `~` is expanded.
    #[serde(default)]
    pub identity_file: Option<String>,
    /// SSH port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Session open timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Per-command read timeout in seconds.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Extra open attempts after a transient connect failure.
    #[serde(default)]
    pub connect_retries: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            password: None,
            identity_file: None,
            port: default_port(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            connect_retries: 0,
        }
    }
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_port() -> u16 {
    22
}

/// Loaded edge routers can be slow to accept sessions.
fn default_connect_timeout_secs() -> u64 {
    60
}

/// A repeat-count ping can legitimately run for most of this.
fn default_read_timeout_secs() -> u64 {
    100
}

/// Probe behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Echo count per ping command.
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    /// Issue each ping twice and discard the first output, letting
    /// ARP/adjacency warm-up settle before the measured run.
    #[serde(default = "default_true")]
    pub warmup: bool,
    /// Worker-pool width: maximum in-flight device sessions.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Optional bound on total run time in seconds; sources still
    /// pending at the deadline are reported as errors.
    #[serde(default)]
    pub run_deadline_secs: Option<u64>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            repeat: default_repeat(),
            warmup: default_true(),
            concurrency: default_concurrency(),
            run_deadline_secs: None,
        }
    }
}

fn default_repeat() -> u32 {
    5
}

fn default_concurrency() -> usize {
    16
}

fn default_true() -> bool {
    true
}

/// Report and manifest locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory run reports are written to (created if absent).
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// Source device manifest, one `<name> <address>` per line.
    #[serde(default = "default_sources_file")]
    pub sources_file: PathBuf,
    /// Fixed destination manifest, one address per line.
    #[serde(default = "default_destinations_file")]
    pub destinations_file: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            sources_file: default_sources_file(),
            destinations_file: default_destinations_file(),
        }
    }
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("net_tests")
}

fn default_sources_file() -> PathBuf {
    PathBuf::from("office_wan_devices.txt")
}

fn default_destinations_file() -> PathBuf {
    PathBuf::from("test_destinations.txt")
}

/// The user config file location, platform dependent.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "nrt", "nrt").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration.
///
/// With `explicit` set, that file must exist and parse; otherwise the
/// project-local `nrt.toml` and then the user config file are tried,
/// falling back to defaults. Environment overrides apply last.
pub fn load_config(explicit: Option<&Path>) -> Result<NrtConfig, ConfigError> {
    let mut config = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            read_config_file(path)?
        }
        None => {
            let project = PathBuf::from("nrt.toml");
            if project.exists() {
                read_config_file(&project)?
            } else if let Some(user) = user_config_path().filter(|p| p.exists()) {
                read_config_file(&user)?
            } else {
                NrtConfig::default()
            }
        }
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<NrtConfig, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.message().to_string(),
    })
}

/// Apply `NRT_*` environment overrides to a loaded config.
pub fn apply_env_overrides(config: &mut NrtConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Override application with an injected lookup, so tests need not
/// mutate the process environment.
fn apply_overrides_from<F>(config: &mut NrtConfig, mut get_env: F)
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(val) = get_env("NRT_USERNAME") {
        config.device.username = val;
    }
    if let Some(val) = get_env("NRT_PASSWORD") {
        config.device.password = Some(val);
    }
    if let Some(val) = get_env("NRT_IDENTITY_FILE") {
        config.device.identity_file = Some(val);
    }
    if let Some(port) = get_env("NRT_PORT").and_then(|val| val.parse().ok()) {
        config.device.port = port;
    }
    if let Some(width) = get_env("NRT_CONCURRENCY").and_then(|val| val.parse().ok()) {
        config.probe.concurrency = width;
    }
    if let Some(val) = get_env("NRT_RESULTS_DIR") {
        config.report.results_dir = PathBuf::from(val);
    }
}
