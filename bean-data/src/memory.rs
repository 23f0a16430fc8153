//! In-memory historical data.

use bean_core::data::{OrderBookSeries, Transactions};
use bean_core::error::DataError;
use bean_core::traits::HistoricalDataProvider;
use bean_core::types::Pair;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Provider over series held in memory.
///
/// Queries clip to the requested window and cut every snapshot to `depth`
/// levels. Unknown pairs yield empty results.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    order_books: HashMap<Pair, OrderBookSeries>,
    transactions: HashMap<Pair, Transactions>,
}

impl InMemoryProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the order book series of `pair`, replacing any previous one.
    #[must_use]
    pub fn with_order_books(mut self, pair: Pair, series: OrderBookSeries) -> Self {
        self.insert_order_books(pair, series);
        self
    }

    /// Adds the tape of `pair`, replacing any previous one.
    #[must_use]
    pub fn with_transactions(mut self, pair: Pair, transactions: Transactions) -> Self {
        self.insert_transactions(pair, transactions);
        self
    }

    /// Sets the order book series of `pair`.
    pub fn insert_order_books(&mut self, pair: Pair, series: OrderBookSeries) {
        self.order_books.insert(pair, series);
    }

    /// Sets the tape of `pair`. The tape is sorted on insert.
    pub fn insert_transactions(&mut self, pair: Pair, transactions: Transactions) {
        self.transactions.insert(pair, transactions.sorted());
    }

    /// Pairs with any stored data.
    #[must_use]
    pub fn pairs(&self) -> Vec<Pair> {
        let mut pairs: Vec<Pair> = self
            .order_books
            .keys()
            .chain(self.transactions.keys())
            .copied()
            .collect();
        pairs.sort();
        pairs.dedup();
        pairs
    }
}

impl HistoricalDataProvider for InMemoryProvider {
    fn order_book_series(
        &self,
        pair: Pair,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        depth: usize,
    ) -> Result<OrderBookSeries, DataError> {
        let series = self
            .order_books
            .get(&pair)
            .map(|s| s.window(start, end).truncated(depth))
            .unwrap_or_default();
        debug!(pair = %pair, snapshots = series.len(), "Order book series loaded");
        Ok(series)
    }

    fn transactions(
        &self,
        pair: Pair,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Transactions, DataError> {
        let tape: Transactions = self
            .transactions
            .get(&pair)
            .map(|tape| {
                tape.iter()
                    .filter(|t| t.timestamp >= start && t.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        debug!(pair = %pair, transactions = tape.len(), "Transactions loaded");
        Ok(tape)
    }
}
