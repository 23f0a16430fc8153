//! Mark-to-market evaluation of a fill tape.
//!
//! A tape becomes a series of portfolio [`Snapshot`]s, one per distinct fill
//! time, and each snapshot is valued in a settlement coin through
//! [`lookup_rate`]. Missing rates give `NaN` values, never errors.

use bean_core::data::Transactions;
use bean_core::ledger::Portfolio;
use bean_core::types::{Coin, Pair};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Portfolio state at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot time
    pub time: DateTime<Utc>,
    /// Portfolio after every fill up to `time`
    pub portfolio: Portfolio,
}

/// Snapshots in ascending time order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshots(pub Vec<Snapshot>);

impl Snapshots {
    /// Replays `transactions` on top of `initial`.
    ///
    /// The first snapshot is `initial` one second before the first fill;
    /// fills sharing a timestamp collapse into one snapshot.
    #[must_use]
    pub fn generate(transactions: &Transactions, initial: &Portfolio) -> Self {
        let tape = transactions.clone().sorted();
        let mut snapshots: Vec<Snapshot> = Vec::with_capacity(tape.len() + 1);
        let mut portfolio = initial.clone();

        for txn in &tape {
            if snapshots.is_empty() {
                snapshots.push(Snapshot {
                    time: txn.timestamp - Duration::seconds(1),
                    portfolio: portfolio.clone(),
                });
            }
            portfolio.apply_fill(txn.pair, txn.price, txn.amount);
            let snapshot = Snapshot {
                time: txn.timestamp,
                portfolio: portfolio.clone(),
            };
            match snapshots.last_mut() {
                Some(last) if last.time == txn.timestamp => *last = snapshot,
                _ => snapshots.push(snapshot),
            }
        }
        Self(snapshots)
    }

    /// Each snapshot less `initial`: the P&L portfolio.
    #[must_use]
    pub fn minus(&self, initial: &Portfolio) -> Self {
        Self(
            self.0
                .iter()
                .map(|s| Snapshot {
                    time: s.time,
                    portfolio: s.portfolio.subtract(initial),
                })
                .collect(),
        )
    }

    /// Snapshot times.
    #[must_use]
    pub fn times(&self) -> Vec<DateTime<Utc>> {
        self.0.iter().map(|s| s.time).collect()
    }

    /// Number of snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no snapshots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Latest snapshot.
    #[must_use]
    pub fn last(&self) -> Option<&Snapshot> {
        self.0.last()
    }

    /// Iterates in time order.
    pub fn iter(&self) -> std::slice::Iter<'_, Snapshot> {
        self.0.iter()
    }
}

/// Value of a snapshot in the settlement coin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    /// Snapshot time
    pub time: DateTime<Utc>,
    /// Settlement coin
    pub mtm_base: Coin,
    /// Portfolio value
    pub pv: f64,
    /// Change against the previous point, zero for the first
    pub pnl: f64,
}

/// Values over time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerformanceSeries(pub Vec<Performance>);

impl PerformanceSeries {
    /// Last value less the value closest in time to `t`; zero when empty.
    #[must_use]
    pub fn pnl_since(&self, t: DateTime<Utc>) -> f64 {
        let Some(last) = self.0.last() else {
            return 0.0;
        };
        let gap = |p: &Performance| (p.time - t).abs();
        let mut nearest = &self.0[0];
        for p in &self.0 {
            if gap(p) < gap(nearest) {
                nearest = p;
            }
        }
        last.pv - nearest.pv
    }

    /// Portfolio values in time order.
    #[must_use]
    pub fn pvs(&self) -> Vec<f64> {
        self.0.iter().map(|p| p.pv).collect()
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in time order.
    pub fn iter(&self) -> std::slice::Iter<'_, Performance> {
        self.0.iter()
    }
}

/// A reference price of one pair at one time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRate {
    /// Observation time
    pub time: DateTime<Utc>,
    /// Price of the coin in the base
    pub price: f64,
}

/// Reference rates per pair.
///
/// Each series is kept in time order with zero prices removed, so lookups
/// search it in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceRateBook(HashMap<Pair, Vec<ReferenceRate>>);

impl ReferenceRateBook {
    /// Empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the rates of `pair`, replacing any previous series.
    pub fn insert(&mut self, pair: Pair, mut rates: Vec<ReferenceRate>) {
        rates.retain(|r| r.price != 0.0);
        rates.sort_by_key(|r| r.time);
        self.0.insert(pair, rates);
    }

    /// Usable rates of `pair` in time order.
    #[must_use]
    pub fn rates(&self, pair: Pair) -> Option<&[ReferenceRate]> {
        self.0.get(&pair).map(Vec::as_slice)
    }

    /// True when a series was stored for `pair`, even an empty one.
    #[must_use]
    pub fn contains_key(&self, pair: &Pair) -> bool {
        self.0.contains_key(pair)
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no pair has a series.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Pair, Vec<ReferenceRate>)> for ReferenceRateBook {
    fn from_iter<I: IntoIterator<Item = (Pair, Vec<ReferenceRate>)>>(iter: I) -> Self {
        let mut book = Self::new();
        for (pair, rates) in iter {
            book.insert(pair, rates);
        }
        book
    }
}

impl<const N: usize> From<[(Pair, Vec<ReferenceRate>); N]> for ReferenceRateBook {
    fn from(entries: [(Pair, Vec<ReferenceRate>); N]) -> Self {
        entries.into_iter().collect()
    }
}

/// One reference rate per print.
#[must_use]
pub fn rates_from_transactions(transactions: &Transactions) -> Vec<ReferenceRate> {
    transactions
        .iter()
        .map(|t| ReferenceRate {
            time: t.timestamp,
            price: t.price,
        })
        .collect()
}

/// Rate of `pair` at `t`: the non-zero rate closest in time, the later one
/// on a tie, clamped to the first or last rate outside the recorded range.
///
/// `None` when the book holds no usable rate for the pair.
#[must_use]
pub fn lookup_rate(pair: Pair, t: DateTime<Utc>, book: &ReferenceRateBook) -> Option<f64> {
    let rates = book.rates(pair)?;
    let first = rates.first()?;
    let idx = rates.partition_point(|r| r.time < t);
    if idx == 0 {
        return Some(first.price);
    }
    let prev = &rates[idx - 1];
    let Some(next) = rates.get(idx) else {
        return Some(prev.price);
    };
    if t - prev.time < next.time - t {
        Some(prev.price)
    } else {
        Some(next.price)
    }
}

/// Values `snapshot` in `mtm_base`.
///
/// A coin without a rate makes the value `NaN` and logs a warning.
#[must_use]
pub fn evaluate_snapshot(snapshot: &Snapshot, mtm_base: Coin, book: &ReferenceRateBook) -> Performance {
    let mut pv = 0.0;
    for (&coin, &balance) in snapshot.portfolio.balances() {
        let rate = if coin == mtm_base {
            Some(1.0)
        } else {
            lookup_rate(Pair::new(coin, mtm_base), snapshot.time, book)
        };
        match rate {
            Some(rate) => pv += balance * rate,
            None => {
                warn!(coin = %coin, mtm_base = %mtm_base, time = %snapshot.time, "Reference rate unavailable");
                pv = f64::NAN;
            }
        }
    }
    Performance {
        time: snapshot.time,
        mtm_base,
        pv,
        pnl: 0.0,
    }
}

/// Values every snapshot and fills in the point-to-point P&L.
#[must_use]
pub fn evaluate_snapshots(
    snapshots: &Snapshots,
    mtm_base: Coin,
    book: &ReferenceRateBook,
) -> PerformanceSeries {
    let mut series: Vec<Performance> = Vec::with_capacity(snapshots.len());
    for snapshot in snapshots.iter() {
        let mut perf = evaluate_snapshot(snapshot, mtm_base, book);
        if let Some(prev) = series.last() {
            perf.pnl = perf.pv - prev.pv;
        }
        series.push(perf);
    }
    PerformanceSeries(series)
}

/// Largest fall from a running peak; zero for an empty series.
#[must_use]
pub fn max_dd(pv: &[f64]) -> f64 {
    drawdowns(pv).into_iter().fold(0.0, f64::max)
}

/// Running peak minus value, per point.
#[must_use]
pub fn drawdowns(pv: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    pv.iter()
        .map(|&v| {
            if v > peak {
                peak = v;
            }
            peak - v
        })
        .collect()
}
