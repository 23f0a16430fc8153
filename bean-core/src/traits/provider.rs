//! Historical market data source.

use chrono::{DateTime, Utc};

use crate::data::{OrderBookSeries, Transactions};
use crate::error::DataError;
use crate::types::Pair;

/// Supplies recorded order books and trades for a window.
///
/// Any backing store (time-series database, file, in-memory fixture) answers
/// the same query shape. Results are ascending in time; an empty result is
/// not an error.
pub trait HistoricalDataProvider {
    /// Snapshots with `start <= t <= end`, each cut to `depth` levels per side.
    fn order_book_series(
        &self,
        pair: Pair,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        depth: usize,
    ) -> Result<OrderBookSeries, DataError>;

    /// Public trades with `start <= t <= end`.
    fn transactions(
        &self,
        pair: Pair,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Transactions, DataError>;
}
