//! Executed trades and the transaction tape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Maker;
use crate::types::Pair;

/// An executed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Traded pair
    pub pair: Pair,
    /// Execution price
    pub price: f64,
    /// Signed amount, positive when coin was bought
    pub amount: f64,
    /// Execution time
    pub timestamp: DateTime<Utc>,
    /// Side that provided liquidity
    pub maker: Maker,
    /// Venue or simulator trade id
    #[serde(default)]
    pub txn_id: String,
}

impl Transaction {
    /// Creates a transaction, deriving the maker side from the amount sign.
    #[must_use]
    pub fn new(
        pair: Pair,
        price: f64,
        amount: f64,
        timestamp: DateTime<Utc>,
        txn_id: impl Into<String>,
    ) -> Self {
        Self {
            pair,
            price,
            amount,
            timestamp,
            maker: Maker::from_amount(amount),
            txn_id: txn_id.into(),
        }
    }

    /// Absolute traded value in the quote coin.
    #[must_use]
    pub fn notional(&self) -> f64 {
        (self.price * self.amount).abs()
    }
}

/// A tape of transactions, kept in ascending time order by its producers.
///
/// Range queries assume the tape is sorted; call [`Transactions::sort`] after
/// concatenating tapes from different sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transactions(Vec<Transaction>);

impl Transactions {
    /// Wraps a vector of transactions as-is.
    #[must_use]
    pub const fn new(txns: Vec<Transaction>) -> Self {
        Self(txns)
    }

    /// Appends a transaction.
    pub fn push(&mut self, txn: Transaction) {
        self.0.push(txn);
    }

    /// Appends every transaction of `other`.
    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Stable sort by timestamp.
    pub fn sort(&mut self) {
        self.0.sort_by_key(|t| t.timestamp);
    }

    /// Returns the tape sorted by timestamp.
    #[must_use]
    pub fn sorted(mut self) -> Self {
        self.sort();
        self
    }

    /// True when the tape holds at least one transaction.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }

    /// Number of transactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the tape is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in tape order.
    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.0.iter()
    }

    /// Transactions as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Transaction] {
        &self.0
    }

    /// Transactions with `from < timestamp <= to`.
    #[must_use]
    pub fn between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        let lo = self.0.partition_point(|t| t.timestamp <= from);
        let hi = self.0.partition_point(|t| t.timestamp <= to);
        Self(self.0.get(lo..hi).map(<[_]>::to_vec).unwrap_or_default())
    }

    /// Transactions with `timestamp <= t`.
    #[must_use]
    pub fn upto(&self, t: DateTime<Utc>) -> Self {
        let hi = self.0.partition_point(|x| x.timestamp <= t);
        Self(self.0[..hi].to_vec())
    }

    /// Transactions with `timestamp > t`.
    #[must_use]
    pub fn since(&self, t: DateTime<Utc>) -> Self {
        let lo = self.0.partition_point(|x| x.timestamp <= t);
        Self(self.0[lo..].to_vec())
    }

    /// Transactions for one pair.
    #[must_use]
    pub fn for_pair(&self, pair: Pair) -> Self {
        self.0.iter().filter(|t| t.pair == pair).cloned().collect()
    }

    /// How much of a resting limit order the tape would have filled.
    ///
    /// A resting buy (`amount > 0`) fills against prints strictly below
    /// `price`; a resting sell against prints strictly above it. The result
    /// carries the sign of `amount` and never exceeds it in magnitude.
    #[must_use]
    pub fn fill(&self, price: f64, amount: f64) -> f64 {
        let crossed: f64 = self
            .0
            .iter()
            .filter(|t| {
                if amount > 0.0 {
                    t.price < price
                } else {
                    t.price > price
                }
            })
            .map(|t| t.amount.abs())
            .sum();
        crossed.min(amount.abs()) * amount.signum()
    }

    /// Total traded amount, unsigned.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.0.iter().map(|t| t.amount.abs()).sum()
    }

    /// Volume-weighted average price; `NaN` for an empty tape.
    #[must_use]
    pub fn vwap(&self) -> f64 {
        let volume = self.volume();
        if volume > 0.0 {
            self.0.iter().map(Transaction::notional).sum::<f64>() / volume
        } else {
            f64::NAN
        }
    }

    /// First and last timestamps, if any.
    #[must_use]
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.0.first()?.timestamp, self.0.last()?.timestamp))
    }
}

impl From<Vec<Transaction>> for Transactions {
    fn from(txns: Vec<Transaction>) -> Self {
        Self(txns)
    }
}

impl FromIterator<Transaction> for Transactions {
    fn from_iter<I: IntoIterator<Item = Transaction>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Transactions {
    type Item = Transaction;
    type IntoIter = std::vec::IntoIter<Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Transactions {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coin;
    use chrono::TimeZone;

    fn create_time(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000 + secs, 0).unwrap()
    }

    fn create_tape() -> Transactions {
        let pair = Pair::new(Coin::Btc, Coin::Usdt);
        Transactions::new(vec![
            Transaction::new(pair, 99.0, 0.5, create_time(0), "a"),
            Transaction::new(pair, 101.0, -1.0, create_time(10), "b"),
            Transaction::new(pair, 98.0, 2.0, create_time(20), "c"),
            Transaction::new(pair, 102.0, -0.25, create_time(30), "d"),
        ])
    }

    #[test]
    fn test_range_queries() {
        let tape = create_tape();
        assert_eq!(tape.between(create_time(0), create_time(20)).len(), 2);
        assert_eq!(tape.between(create_time(30), create_time(40)).len(), 0);
        assert_eq!(tape.upto(create_time(10)).len(), 2);
        assert_eq!(tape.since(create_time(10)).len(), 2);
        assert_eq!(tape.since(create_time(-1)).len(), 4);
    }

    #[test]
    fn test_fill_buy_crosses_lower_prints() {
        let tape = create_tape();
        // prints below 100: 0.5 @ 99 and 2.0 @ 98
        assert!((tape.fill(100.0, 1.0) - 1.0).abs() < 1e-12);
        assert!((tape.fill(100.0, 5.0) - 2.5).abs() < 1e-12);
        assert!(tape.fill(98.0, 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fill_sell_crosses_higher_prints() {
        let tape = create_tape();
        assert!((tape.fill(100.0, -5.0) + 1.25).abs() < 1e-12);
        assert!((tape.fill(101.5, -0.1) + 0.1).abs() < 1e-12);
        assert!(tape.fill(102.0, -1.0).abs() < 1e-12);
    }

    #[test]
    fn test_volume_and_vwap() {
        let tape = create_tape();
        assert!((tape.volume() - 3.75).abs() < 1e-12);
        let expected = (99.0 * 0.5 + 101.0 + 98.0 * 2.0 + 102.0 * 0.25) / 3.75;
        assert!((tape.vwap() - expected).abs() < 1e-12);
        assert!(Transactions::default().vwap().is_nan());
    }

    #[test]
    fn test_maker_from_sign() {
        let tape = create_tape();
        assert_eq!(tape.as_slice()[0].maker, Maker::Buyer);
        assert_eq!(tape.as_slice()[1].maker, Maker::Seller);
    }

    #[test]
    fn test_sort_and_validity() {
        let mut tape: Transactions = create_tape().into_iter().rev().collect();
        assert!(tape.is_valid());
        tape.sort();
        assert_eq!(tape.time_range(), Some((create_time(0), create_time(30))));
        assert!(!Transactions::default().is_valid());
    }
}
