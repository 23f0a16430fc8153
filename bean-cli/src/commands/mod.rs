//! CLI command implementations.

pub mod backtest;
pub mod contract;
pub mod price;
