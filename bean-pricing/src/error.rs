//! Pricing error types.

use thiserror::Error;

/// Errors from the pricing engine.
///
/// Failure to converge is not an error: the solvers return `NaN`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// Option-only calculation requested for another kind of contract.
    #[error("[Pricing] '{contract}' is not an option")]
    NotAnOption {
        /// Contract name.
        contract: String,
    },

    /// Market input outside its domain.
    #[error("[Pricing] invalid {field}: {reason}")]
    InvalidInput {
        /// Input name.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl PricingError {
    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
