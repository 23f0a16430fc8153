//! Data provider and sink errors.

use bean_core::error::DataError;
use thiserror::Error;

/// Errors raised while loading datasets or writing market data points.
#[derive(Error, Debug)]
pub enum DataProviderError {
    /// File could not be read or written
    #[error("[DataProvider] I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Dataset is not valid JSON for the expected shape
    #[error("[DataProvider] JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Records of a series are out of time order
    #[error("[DataProvider] {series} not sorted at index {index}")]
    Unsorted {
        /// Series name
        series: String,
        /// Index of the first out-of-order record
        index: usize,
    },

    /// The sink was shut down
    #[error("[DataProvider] sink is closed")]
    Closed,
}

impl From<DataProviderError> for DataError {
    fn from(err: DataProviderError) -> Self {
        match err {
            DataProviderError::Unsorted { series, index } => Self::Unsorted { series, index },
            DataProviderError::Json(e) => Self::Malformed {
                reason: e.to_string(),
            },
            other => Self::Unavailable {
                reason: other.to_string(),
            },
        }
    }
}
