//! Error types for bean.
//!
//! Each concern owns one `thiserror` enum. Missing market data is never an
//! error in this crate: lookups return empty books, `NaN` prices or `None`.
//!
//! # Error Types
//!
//! - [`PairError`] - Unknown pair metadata, bad coin or pair strings, non-finite prices
//! - [`ContractError`] - Contract name parsing failures
//! - [`ConfigError`] - Configuration loading and validation
//! - [`DataError`] - Historical data loading failures
//! - [`ExchangeError`] - Order placement failures

mod config;
mod contract;
mod data;
mod exchange;
mod pair;

pub use config::ConfigError;
pub use contract::ContractError;
pub use data::DataError;
pub use exchange::ExchangeError;
pub use pair::PairError;
