//! Backtest error types.

use bean_core::error::{DataError, ExchangeError, PairError};
use bean_core::types::Pair;
use thiserror::Error;

/// Backtest error type.
#[derive(Error, Debug)]
pub enum BacktestError {
    /// An action named an exchange that is not simulated
    #[error("[Backtest] unknown exchange: {0}")]
    UnknownExchange(String),

    /// No data was loaded for a pair
    #[error("[Backtest] unknown pair: {0}")]
    UnknownPair(Pair),

    /// Invalid run parameters
    #[error("[Backtest] invalid configuration: {0}")]
    InvalidConfig(String),

    /// Historical data could not be loaded
    #[error("[Backtest] data error: {0}")]
    Data(#[from] DataError),

    /// Pair metadata lookup failed
    #[error("[Backtest] {0}")]
    Pair(#[from] PairError),

    /// Exchange refused an operation
    #[error("[Backtest] {0}")]
    Exchange(#[from] ExchangeError),
}
