//! Configuration.
//!
//! # Types
//!
//! - [`ConfigLoader`] - YAML / TOML / JSON loader
//! - [`BacktestConfig`] - One backtest run

mod backtest;
mod loader;

pub use backtest::{BacktestConfig, StrategyConfig};
pub use loader::{ConfigFormat, ConfigLoader};
