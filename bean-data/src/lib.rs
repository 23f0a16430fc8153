//! # Bean Data
//!
//! Market data plumbing for the bean backtester.
//!
//! This crate provides:
//! - `InMemoryProvider` and `JsonFileProvider` historical data providers
//! - `BatchingSink`, a timer-flushed buffer of market data points

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

/// Error types
pub mod error;

/// JSON file provider
pub mod file;

/// In-memory provider
pub mod memory;

/// Batching sink
pub mod sink;

pub use error::DataProviderError;
pub use file::{BookRecord, Dataset, JsonFileProvider};
pub use memory::InMemoryProvider;
pub use sink::{BatchingSink, JsonLinesWriter, MemoryWriter, Point, PointWriter};
