//! JSON file dataset.
//!
//! A dataset file holds every recorded book and trade for a run:
//!
//! ```json
//! {
//!   "order_books": [
//!     {"pair": "BTC/USDT", "timestamp": "2020-01-01T00:00:00Z",
//!      "bids": [{"price": 100.0, "amount": 1.0}],
//!      "asks": [{"price": 101.0, "amount": 1.0}]}
//!   ],
//!   "transactions": [
//!     {"pair": "BTC/USDT", "price": 100.5, "amount": -0.1,
//!      "timestamp": "2020-01-01T00:00:30Z", "maker": "buyer"}
//!   ]
//! }
//! ```
//!
//! Records must be ascending in time per pair.

use bean_core::data::{
    Order, OrderBook, OrderBookSeries, OrderBookSnapshot, Transaction, Transactions,
};
use bean_core::error::DataError;
use bean_core::traits::HistoricalDataProvider;
use bean_core::types::Pair;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::error::DataProviderError;
use crate::memory::InMemoryProvider;

/// One recorded book in a [`Dataset`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    /// Pair of the book
    pub pair: Pair,
    /// Observation time
    pub timestamp: DateTime<Utc>,
    /// Bid levels
    #[serde(default)]
    pub bids: Vec<Order>,
    /// Ask levels
    #[serde(default)]
    pub asks: Vec<Order>,
}

/// File contents of a [`JsonFileProvider`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Recorded books of every pair
    #[serde(default)]
    pub order_books: Vec<BookRecord>,
    /// Public trades of every pair
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Dataset {
    /// Parses and validates a dataset.
    pub fn from_json(content: &str) -> Result<Self, DataProviderError> {
        let dataset: Self = serde_json::from_str(content)?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Checks per-pair ascending timestamps.
    pub fn validate(&self) -> Result<(), DataProviderError> {
        check_ascending("order_books", self.order_books.iter().map(|r| (r.pair, r.timestamp)))?;
        check_ascending(
            "transactions",
            self.transactions.iter().map(|t| (t.pair, t.timestamp)),
        )
    }
}

fn check_ascending(
    series: &str,
    records: impl Iterator<Item = (Pair, DateTime<Utc>)>,
) -> Result<(), DataProviderError> {
    let mut last: HashMap<Pair, DateTime<Utc>> = HashMap::new();
    for (index, (pair, timestamp)) in records.enumerate() {
        if let Some(prev) = last.insert(pair, timestamp) {
            if timestamp < prev {
                return Err(DataProviderError::Unsorted {
                    series: series.to_string(),
                    index,
                });
            }
        }
    }
    Ok(())
}

/// Provider backed by a [`Dataset`] file loaded eagerly.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    inner: InMemoryProvider,
}

impl JsonFileProvider {
    /// Loads and validates the dataset at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DataProviderError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let dataset = Dataset::from_json(&content)?;
        info!(
            path = %path.display(),
            order_books = dataset.order_books.len(),
            transactions = dataset.transactions.len(),
            "Dataset loaded"
        );
        Ok(Self::from_dataset(dataset))
    }

    /// Wraps an already validated dataset.
    #[must_use]
    pub fn from_dataset(dataset: Dataset) -> Self {
        let mut books: HashMap<Pair, Vec<OrderBookSnapshot>> = HashMap::new();
        for record in dataset.order_books {
            books
                .entry(record.pair)
                .or_default()
                .push(OrderBookSnapshot::new(
                    record.timestamp,
                    OrderBook::new(record.bids, record.asks),
                ));
        }
        let mut tapes: HashMap<Pair, Vec<Transaction>> = HashMap::new();
        for txn in dataset.transactions {
            tapes.entry(txn.pair).or_default().push(txn);
        }

        let mut inner = InMemoryProvider::new();
        for (pair, snapshots) in books {
            inner.insert_order_books(pair, OrderBookSeries::new(snapshots));
        }
        for (pair, tape) in tapes {
            inner.insert_transactions(pair, Transactions::new(tape));
        }
        Self { inner }
    }

    /// Pairs present in the dataset.
    #[must_use]
    pub fn pairs(&self) -> Vec<Pair> {
        self.inner.pairs()
    }
}

impl HistoricalDataProvider for JsonFileProvider {
    fn order_book_series(
        &self,
        pair: Pair,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        depth: usize,
    ) -> Result<OrderBookSeries, DataError> {
        self.inner.order_book_series(pair, start, end, depth)
    }

    fn transactions(
        &self,
        pair: Pair,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Transactions, DataError> {
        self.inner.transactions(pair, start, end)
    }
}
