//! Built-in strategy implementations.
//!
//! Strategies are written against the `Exchange` views handed to `grind`
//! and run unchanged on the simulator.

mod order_scan;
mod simple_mm;
mod stack_bias_mm;

pub use order_scan::{OrderScan, OrderScanParams, StaticOrder};
pub use simple_mm::{SimpleMm, SimpleMmParams};
pub use stack_bias_mm::{StackBiasMm, StackBiasMmParams};

use bean_core::config::{BacktestConfig, StrategyConfig};
use bean_core::traits::Strategy;
use bean_core::types::Pair;

use crate::error::BacktestError;

/// Builds the strategy selected by `config.strategy`.
pub fn from_config(config: &BacktestConfig) -> Result<Box<dyn Strategy>, BacktestError> {
    Ok(match config.strategy {
        StrategyConfig::SimpleMm { .. } => Box::new(SimpleMm::from_config(config)?),
        StrategyConfig::StackBiasMm { .. } => Box::new(StackBiasMm::from_config(config)?),
        StrategyConfig::OrderScan { .. } => Box::new(OrderScan::from_config(config)?),
    })
}

/// The pair a single-pair strategy trades: the first configured one.
fn first_pair(config: &BacktestConfig) -> Result<Pair, BacktestError> {
    config
        .pairs
        .first()
        .copied()
        .ok_or_else(|| BacktestError::InvalidConfig("no pairs configured".to_string()))
}
