//! Coin and pair errors.

use thiserror::Error;

/// Errors raised by coin and pair lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PairError {
    /// No order price precision is known for the pair.
    #[error("[Pair] price precision not known for {pair}")]
    UnknownPrecision {
        /// Rendered pair (e.g. `IOTAUSDT`).
        pair: String,
    },

    /// Coin symbol is not recognised.
    #[error("[Pair] unknown coin '{0}'")]
    UnknownCoin(String),

    /// Pair string is not in `COIN/BASE` form.
    #[error("[Pair] malformed pair '{0}', expected COIN/BASE")]
    MalformedPair(String),

    /// Price is NaN or infinite and cannot be rounded.
    #[error("[Pair] price {0} is not finite")]
    NonFinitePrice(String),

    /// No order amount precision is known for the coin.
    #[error("[Pair] amount precision not known for {coin}")]
    UnknownAmountPrecision {
        /// Coin ticker
        coin: String,
    },

    /// Amount is NaN or infinite and cannot be rounded.
    #[error("[Pair] amount {0} is not finite")]
    NonFiniteAmount(String),
}
