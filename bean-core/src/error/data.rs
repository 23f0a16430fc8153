//! Historical data errors.

use thiserror::Error;

/// Errors raised by historical data providers.
///
/// A provider returning an empty series is not an error; these variants cover
/// data that could not be read or is structurally wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// Underlying source could not be read.
    #[error("[Data] source unavailable: {reason}")]
    Unavailable {
        /// Reason reported by the source.
        reason: String,
    },

    /// Records are not in ascending time order.
    #[error("[Data] {series} not sorted at index {index}")]
    Unsorted {
        /// Series name (`order_books`, `transactions`).
        series: String,
        /// Index of the first out-of-order record.
        index: usize,
    },

    /// A record could not be decoded.
    #[error("[Data] malformed record: {reason}")]
    Malformed {
        /// Decoder message.
        reason: String,
    },
}
