//! Logging configuration types.

use serde::{Deserialize, Serialize};

use super::LoggingError;

/// Configuration for the logging system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive (e.g. "info", "bean_backtest=debug")
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,

    /// Output targets
    #[serde(default = "default_outputs")]
    pub outputs: Vec<LogOutput>,

    /// Include thread IDs in log output
    #[serde(default)]
    pub include_thread_id: bool,

    /// Include file and line information
    #[serde(default)]
    pub include_file_info: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            outputs: default_outputs(),
            include_thread_id: false,
            include_file_info: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_outputs() -> Vec<LogOutput> {
    vec![LogOutput::Stderr]
}

impl LogConfig {
    /// Stderr logging at the level implied by a `-v` count.
    #[must_use]
    pub fn for_verbosity(verbose: u8, format: LogFormat) -> Self {
        let level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        Self {
            level: level.to_string(),
            format,
            ..Self::default()
        }
    }

    /// Rejects configurations that cannot produce any output.
    pub fn validate(&self) -> Result<(), LoggingError> {
        if self.level.trim().is_empty() {
            return Err(LoggingError::InvalidConfig("level cannot be empty".to_string()));
        }
        if self.outputs.is_empty() {
            return Err(LoggingError::InvalidConfig("no outputs configured".to_string()));
        }
        for output in &self.outputs {
            if let LogOutput::File { path, .. } = output {
                if path.is_empty() {
                    return Err(LoggingError::InvalidConfig(
                        "file output needs a directory".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines for log aggregation systems
    Json,
    /// Multi-line human-readable output
    #[default]
    Pretty,
    /// Single-line human-readable output
    Compact,
}

/// Log output target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogOutput {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
    /// Files under a directory, optionally rotated
    File {
        /// Directory for log files
        path: String,
        /// Rotation schedule, daily when absent
        #[serde(default)]
        rotation: Option<RotationConfig>,
    },
}

/// Log rotation schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationConfig {
    /// Rotate logs hourly
    Hourly,
    /// Rotate logs daily
    #[default]
    Daily,
    /// Never rotate (single file)
    Never,
}
