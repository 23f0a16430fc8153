//! Account ledger.
//!
//! # Types
//!
//! - [`Portfolio`] - Balances, locked collateral and contract positions

mod portfolio;

pub use portfolio::Portfolio;
