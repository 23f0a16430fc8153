//! Timed order book snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::OrderBook;
use crate::error::DataError;

static EMPTY_BOOK: OrderBook = OrderBook::EMPTY;

/// An order book observed at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    /// Observation time
    pub timestamp: DateTime<Utc>,
    /// Book at `timestamp`
    pub book: OrderBook,
}

impl OrderBookSnapshot {
    /// Creates a new snapshot.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, book: OrderBook) -> Self {
        Self { timestamp, book }
    }
}

/// Ascending series of [`OrderBookSnapshot`]s with last-known-value lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderBookSeries {
    snapshots: Vec<OrderBookSnapshot>,
}

impl OrderBookSeries {
    /// Builds a series, sorting snapshots by timestamp.
    #[must_use]
    pub fn new(mut snapshots: Vec<OrderBookSnapshot>) -> Self {
        snapshots.sort_by_key(|s| s.timestamp);
        Self { snapshots }
    }

    /// Builds a series from snapshots that must already be ascending.
    pub fn from_sorted(snapshots: Vec<OrderBookSnapshot>) -> Result<Self, DataError> {
        if let Some(index) = snapshots
            .windows(2)
            .position(|w| w[1].timestamp < w[0].timestamp)
        {
            return Err(DataError::Unsorted {
                series: "order_books".to_string(),
                index: index + 1,
            });
        }
        Ok(Self { snapshots })
    }

    /// Snapshots in ascending time order.
    #[must_use]
    pub fn snapshots(&self) -> &[OrderBookSnapshot] {
        &self.snapshots
    }

    /// Number of snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// True when the series holds no snapshots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// The latest book observed at or before `t`.
    ///
    /// Before the first snapshot, and for an empty series, this is an empty
    /// book: nothing observed after `t` is ever returned.
    #[must_use]
    pub fn book_at(&self, t: DateTime<Utc>) -> &OrderBook {
        let idx = self.snapshots.partition_point(|s| s.timestamp <= t);
        match idx.checked_sub(1) {
            Some(i) => &self.snapshots[i].book,
            None => &EMPTY_BOOK,
        }
    }

    /// Snapshots with `start <= timestamp <= end`.
    #[must_use]
    pub fn window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            snapshots: self
                .snapshots
                .iter()
                .filter(|s| s.timestamp >= start && s.timestamp <= end)
                .cloned()
                .collect(),
        }
    }

    /// Copy with every book cut down to `depth` levels per side.
    #[must_use]
    pub fn truncated(&self, depth: usize) -> Self {
        Self {
            snapshots: self
                .snapshots
                .iter()
                .map(|s| OrderBookSnapshot::new(s.timestamp, s.book.truncated(depth)))
                .collect(),
        }
    }
}

impl FromIterator<OrderBookSnapshot> for OrderBookSeries {
    fn from_iter<I: IntoIterator<Item = OrderBookSnapshot>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Order;
    use chrono::{Duration, TimeZone};

    fn create_time(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000 + secs, 0).unwrap()
    }

    fn create_book(bid: f64) -> OrderBook {
        OrderBook::new(vec![Order::new(bid, 1.0)], vec![Order::new(bid + 1.0, 1.0)])
    }

    fn create_series() -> OrderBookSeries {
        OrderBookSeries::new(vec![
            OrderBookSnapshot::new(create_time(20), create_book(102.0)),
            OrderBookSnapshot::new(create_time(0), create_book(100.0)),
            OrderBookSnapshot::new(create_time(10), create_book(101.0)),
        ])
    }

    #[test]
    fn test_new_sorts() {
        let series = create_series();
        assert_eq!(series.len(), 3);
        assert!(series.snapshots().windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_book_at_last_known_value() {
        let series = create_series();
        assert_eq!(series.book_at(create_time(0)).best_bid().price, 100.0);
        assert_eq!(series.book_at(create_time(9)).best_bid().price, 100.0);
        assert_eq!(series.book_at(create_time(10)).best_bid().price, 101.0);
        assert_eq!(series.book_at(create_time(1000)).best_bid().price, 102.0);
    }

    #[test]
    fn test_book_at_before_first_is_empty() {
        let series = create_series();
        let book = series.book_at(create_time(0) - Duration::seconds(1));
        assert!(!book.is_valid());
        assert!(OrderBookSeries::default().book_at(create_time(0)).is_empty());
    }

    #[test]
    fn test_from_sorted_rejects_unsorted() {
        let snapshots = vec![
            OrderBookSnapshot::new(create_time(10), create_book(100.0)),
            OrderBookSnapshot::new(create_time(0), create_book(100.0)),
        ];
        let err = OrderBookSeries::from_sorted(snapshots).unwrap_err();
        assert!(matches!(err, DataError::Unsorted { index: 1, .. }));
    }

    #[test]
    fn test_window_and_truncate() {
        let series = create_series();
        let window = series.window(create_time(5), create_time(20));
        assert_eq!(window.len(), 2);
        let shallow = series.truncated(0);
        assert!(!shallow.book_at(create_time(20)).is_valid());
    }
}
