//! Structured logging initialization.
//!
//! One routine shared by every binary so console and file output stay
//! consistent. File logging mirrors the long-standing operational
//! habit of keeping a rolling log next to the tool.

use anyhow::Result;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, util::SubscriberInitExt};

/// Logging output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-friendly console output.
    #[default]
    Pretty,
    /// JSON lines for machine parsing.
    Json,
    /// Compact single-line output.
    Compact,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

/// Configuration for logging initialization.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Base log level (trace, debug, info, warn, error, off).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Optional daily-rolling log file.
    pub file_path: Option<PathBuf>,
}

impl LogConfig {
    /// Build a logging configuration from the environment.
    ///
    /// Honors `NRT_LOG_LEVEL`, `NRT_LOG_FORMAT` (pretty|json|compact)
    /// and `NRT_LOG_FILE`. A set `RUST_LOG` wins over the level.
    pub fn from_env(default_level: &str) -> Self {
        let mut config = Self {
            level: std::env::var("NRT_LOG_LEVEL").unwrap_or_else(|_| default_level.to_string()),
            ..Self::default()
        };

        if let Ok(format) = std::env::var("NRT_LOG_FORMAT")
            && let Some(parsed) = LogFormat::parse(&format)
        {
            config.format = parsed;
        }

        if let Ok(path) = std::env::var("NRT_LOG_FILE")
            && !path.trim().is_empty()
        {
            config.file_path = Some(PathBuf::from(path));
        }

        config
    }

    fn env_filter(&self) -> EnvFilter {
        if std::env::var_os("RUST_LOG").is_some()
            && let Ok(filter) = EnvFilter::try_from_default_env()
        {
            return filter;
        }
        EnvFilter::new(self.level.clone())
    }
}

/// Keeps the non-blocking file writer alive for the process lifetime.
pub struct LoggingGuards {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initialize tracing for the current process.
///
/// Returns guards that must be held until exit when file logging is
/// enabled. Re-initialization (tests) is tolerated.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuards> {
    let filter = config.env_filter();

    let (file_writer, file_guard) = match config.file_path.as_ref() {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path.file_name().unwrap_or_else(|| OsStr::new("nrt.log"));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true);

    let init_result = match (config.format, file_writer) {
        (LogFormat::Pretty, None) => builder.pretty().finish().try_init(),
        (LogFormat::Json, None) => builder.with_ansi(false).json().finish().try_init(),
        (LogFormat::Compact, None) => builder.compact().finish().try_init(),
        (LogFormat::Pretty, Some(writer)) => builder
            .with_writer(writer)
            .with_ansi(false)
            .finish()
            .try_init(),
        (LogFormat::Json, Some(writer)) => builder
            .with_writer(writer)
            .with_ansi(false)
            .json()
            .finish()
            .try_init(),
        (LogFormat::Compact, Some(writer)) => builder
            .with_writer(writer)
            .with_ansi(false)
            .compact()
            .finish()
            .try_init(),
    };

    if let Err(err) = init_result {
        if err.to_string().contains("already") {
            return Ok(LoggingGuards {
                _file_guard: file_guard,
            });
        }
        return Err(anyhow::anyhow!(err.to_string()));
    }

    Ok(LoggingGuards {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parsing_accepts_known_names() {
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse(" JSON "), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("compact"), Some(LogFormat::Compact));
        assert_eq!(LogFormat::parse("fancy"), None);
    }

    #[test]
    fn default_config_has_no_file() {
        let config = LogConfig::default();
        assert!(config.file_path.is_none());
        assert_eq!(config.format, LogFormat::Pretty);
    }
}
