//! # Bean Core
//!
//! Shared model for the bean backtester and risk tools.
//!
//! This crate provides:
//! - Coins and pairs with exchange price precision
//! - The order book core: bid/ask ladder, depth queries and matching
//! - Timed order book series and transaction tapes
//! - Derivative contracts, the contract name grammar and positions
//! - The portfolio ledger with locked collateral
//! - `Exchange`, `Strategy` and `HistoricalDataProvider` traits
//! - Configuration loading from YAML, TOML or JSON

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::float_cmp)]

/// Coins and pairs
pub mod types;

/// Order books, transactions and trade logs
pub mod data;

/// Derivative contracts and positions
pub mod contract;

/// Portfolio ledger
pub mod ledger;

/// Error types
pub mod error;

/// Exchange, strategy and data provider traits
pub mod traits;

/// Configuration loading
pub mod config;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::contract::*;
    pub use crate::data::*;
    pub use crate::error::*;
    pub use crate::ledger::*;
    pub use crate::traits::*;
    pub use crate::types::*;
}
