//! Exchange operation errors.

use thiserror::Error;

use super::PairError;

/// Errors returned by [`Exchange`](crate::traits::Exchange) implementations.
///
/// Cancelling an unknown or already finished order is not an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// Price or amount cannot form an order.
    #[error("[Exchange] invalid order {field}: {reason}")]
    InvalidOrder {
        /// Offending field (`price`, `amount`).
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Pair metadata lookup failed.
    #[error("[Exchange] {0}")]
    Pair(#[from] PairError),

    /// Venue refused the request.
    #[error("[Exchange] rejected: {reason}")]
    Rejected {
        /// Venue message.
        reason: String,
    },
}

impl ExchangeError {
    /// Creates an invalid order error.
    #[must_use]
    pub fn invalid_order(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOrder {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
