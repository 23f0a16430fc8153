//! # Bean Pricing
//!
//! Option valuation for the bean backtester and risk tools.
//!
//! This crate provides:
//! - Black-76 forward pricing and a Newton implied volatility solver
//! - Finite-difference Greeks and bucket delta for contract positions
//! - Portfolio risk and the spot-shock risk ladder

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::float_cmp)]
#![allow(clippy::similar_names)]

/// Black-76 pricing and implied volatility
pub mod black76;

/// Pricing extensions on contracts
pub mod contract;

/// Pricing errors
pub mod error;

/// Position value and Greeks
pub mod greeks;

/// Portfolio risk
pub mod risk;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::black76::*;
    pub use crate::contract::*;
    pub use crate::error::*;
    pub use crate::greeks::*;
    pub use crate::risk::*;
}
