//! # Bean Telemetry
//!
//! Logging and tracing for the bean tools.
//!
//! This crate provides:
//! - Structured logging with JSON, pretty and compact formats
//! - Stdout, stderr and rotated file outputs
//! - Span helpers for commands, backtests and pricing

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

/// Logging configuration and initialization
pub mod logging;

/// Span definitions
pub mod spans;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::logging::{LogConfig, LogFormat, LogOutput, LoggingError, init_logging};
    pub use crate::spans::*;
}
