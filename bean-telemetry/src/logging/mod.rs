//! Structured logging for the bean tools.
//!
//! Supports JSON, pretty and compact formats written to stdout, stderr or
//! rotated files. `RUST_LOG` overrides the configured level when set.

mod config;

pub use config::{LogConfig, LogFormat, LogOutput, RotationConfig};

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// File name prefix for file outputs.
pub const LOG_FILE_PREFIX: &str = "bean.log";

/// Initialize the logging system with the given configuration.
///
/// Returns guards that must be kept alive for the duration of the program
/// so that file outputs are flushed.
///
/// # Example
///
/// ```no_run
/// use bean_telemetry::logging::{init_logging, LogConfig};
///
/// let config = LogConfig::default();
/// let _guards = init_logging(&config).expect("Failed to initialize logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<Vec<WorkerGuard>, LoggingError> {
    config.validate()?;

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| LoggingError::InvalidConfig(format!("bad level {}: {e}", config.level)))?,
    };

    let mut guards = Vec::new();
    let mut layers: Vec<Box<dyn Layer<_> + Send + Sync>> = Vec::new();

    for output in &config.outputs {
        match output {
            LogOutput::Stdout => layers.push(create_layer(config, std::io::stdout, true)),
            LogOutput::Stderr => layers.push(create_layer(config, std::io::stderr, true)),
            LogOutput::File { path, rotation } => {
                let appender = create_file_appender(Path::new(path), rotation.unwrap_or_default())?;
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                layers.push(create_layer(config, non_blocking, false));
                guards.push(guard);
            }
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(guards)
}

fn create_layer<S, W>(config: &LogConfig, writer: W, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_file_info)
        .with_line_number(config.include_file_info);

    match config.format {
        LogFormat::Json => layer.json().flatten_event(true).boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

fn create_file_appender(
    dir: &Path,
    rotation: RotationConfig,
) -> Result<RollingFileAppender, LoggingError> {
    std::fs::create_dir_all(dir)?;
    Ok(match rotation {
        RotationConfig::Hourly => tracing_appender::rolling::hourly(dir, LOG_FILE_PREFIX),
        RotationConfig::Daily => tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX),
        RotationConfig::Never => tracing_appender::rolling::never(dir, LOG_FILE_PREFIX),
    })
}

/// Errors that can occur during logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create log directory
    #[error("[Logging] failed to create log directory: {0}")]
    DirectoryCreation(#[from] std::io::Error),

    /// Invalid configuration
    #[error("[Logging] invalid configuration: {0}")]
    InvalidConfig(String),

    /// A global subscriber is already installed
    #[error("[Logging] initialization failed: {0}")]
    Init(String),
}
