//! # Bean Backtest
//!
//! Deterministic backtesting for the bean trading tools.
//!
//! This crate provides:
//! - An exchange simulator that fills resting orders against historical
//!   order books and transaction tapes
//! - A virtual-time driver running strategies tick by tick
//! - Mark-to-market evaluation of fill tapes against reference rates
//! - Trade statistics (P&L, drawdown, Sharpe, win/loss)
//! - Built-in strategies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::float_cmp)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::doc_markdown)]

/// Driver loop and run results.
pub mod driver;
mod error;
/// Snapshots, performance series and reference rates.
pub mod evaluate;
/// Exchange simulator.
pub mod simulator;
/// Trade statistics.
pub mod stats;
/// Built-in strategies.
pub mod strategies;

pub use driver::{Backtest, BacktestResult, OrderRef, perform_actions};
pub use error::BacktestError;
pub use evaluate::{
    Performance, PerformanceSeries, ReferenceRate, ReferenceRateBook, Snapshot, Snapshots,
    evaluate_snapshot, evaluate_snapshots, lookup_rate, max_dd, rates_from_transactions,
};
pub use simulator::{SimOrder, Simulator};
pub use stats::{CoinStats, IntervalPerformance, PortfolioStats, TradeStats, WinLoss};
pub use strategies::{
    OrderScan, OrderScanParams, SimpleMm, SimpleMmParams, StackBiasMm, StackBiasMmParams,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::driver::{Backtest, BacktestResult, OrderRef, perform_actions};
    pub use crate::error::BacktestError;
    pub use crate::evaluate::{
        PerformanceSeries, ReferenceRateBook, Snapshots, evaluate_snapshots, lookup_rate,
    };
    pub use crate::simulator::Simulator;
    pub use crate::stats::{IntervalPerformance, PortfolioStats, TradeStats};
    pub use crate::strategies::{
        OrderScan, OrderScanParams, SimpleMm, SimpleMmParams, StackBiasMm, StackBiasMmParams,
    };
}
