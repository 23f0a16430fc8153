//! Account trade history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Side, Transaction, Transactions};
use crate::ledger::Portfolio;
use crate::types::{Coin, Pair};

/// One of our own fills as reported by an exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLog {
    /// Order that filled
    pub order_id: String,
    /// Traded pair
    pub pair: Pair,
    /// Fill price
    pub price: f64,
    /// Unsigned fill quantity
    pub quantity: f64,
    /// Commission charged
    #[serde(default)]
    pub commission: f64,
    /// Coin the commission was charged in
    #[serde(default)]
    pub commission_asset: Option<Coin>,
    /// Fill time
    pub time: DateTime<Utc>,
    /// Side of our order
    pub side: Side,
    /// Exchange trade id, if any
    #[serde(default)]
    pub txn_id: String,
}

impl TradeLog {
    /// Quantity signed by side.
    #[must_use]
    pub fn signed_quantity(&self) -> f64 {
        self.quantity.abs() * self.side.sign()
    }
}

/// Buy/sell aggregates for one pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeLogSummary {
    /// Summarised pair
    pub pair: Option<Pair>,
    /// Total sold quantity
    pub sell_amount: f64,
    /// Total sold value in the base coin
    pub sell_value: f64,
    /// Total bought quantity
    pub buy_amount: f64,
    /// Total bought value in the base coin
    pub buy_value: f64,
    /// Commission paid per coin
    pub fee: BTreeMap<Coin, f64>,
}

impl TradeLogSummary {
    /// Average buy price; `NaN` with no buys.
    #[must_use]
    pub fn avg_buy_price(&self) -> f64 {
        self.buy_value / self.buy_amount
    }

    /// Average sell price; `NaN` with no sells.
    #[must_use]
    pub fn avg_sell_price(&self) -> f64 {
        self.sell_value / self.sell_amount
    }

    /// Bought minus sold quantity.
    #[must_use]
    pub fn net_exposure(&self) -> f64 {
        self.buy_amount - self.sell_amount
    }

    /// Profit locked in by the matched part of buys and sells.
    #[must_use]
    pub fn realized_pl(&self) -> f64 {
        (self.avg_sell_price() - self.avg_buy_price()) * self.buy_amount.min(self.sell_amount)
    }

    /// Mark-to-market profit of the open exposure at `mid`.
    #[must_use]
    pub fn unrealized_pl(&self, mid: f64) -> f64 {
        let exposure = self.net_exposure();
        if exposure < 0.0 {
            exposure * (mid - self.avg_sell_price())
        } else {
            exposure * (mid - self.avg_buy_price())
        }
    }

    /// Break-even price of the open exposure.
    #[must_use]
    pub fn avg_cost(&self) -> f64 {
        (self.sell_value - self.buy_value) / (self.buy_amount - self.sell_amount)
    }
}

/// A list of trade logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeLogs(pub Vec<TradeLog>);

impl TradeLogs {
    /// Stable sort by fill time.
    pub fn sort(&mut self) {
        self.0.sort_by_key(|t| t.time);
    }

    /// Aggregates the trades of `pair`.
    #[must_use]
    pub fn summary(&self, pair: Pair) -> TradeLogSummary {
        let mut summary = TradeLogSummary {
            pair: Some(pair),
            ..TradeLogSummary::default()
        };
        for trade in self.0.iter().filter(|t| t.pair == pair) {
            match trade.side {
                Side::Buy => {
                    summary.buy_amount += trade.quantity;
                    summary.buy_value += trade.quantity * trade.price;
                }
                Side::Sell => {
                    summary.sell_amount += trade.quantity;
                    summary.sell_value += trade.quantity * trade.price;
                }
            }
            if let Some(asset) = trade.commission_asset {
                *summary.fee.entry(asset).or_default() += trade.commission;
            }
        }
        summary
    }

    /// Splits at `t`: the net position built by trades strictly before `t`,
    /// and the trades at or after `t`.
    ///
    /// The position ignores commission.
    #[must_use]
    pub fn since(&self, t: DateTime<Utc>) -> (Portfolio, Vec<TradeLog>) {
        let (before, after): (Vec<&TradeLog>, Vec<&TradeLog>) =
            self.0.iter().partition(|trade| trade.time < t);
        let mut position = Portfolio::new();
        for trade in before {
            position.apply_fill(trade.pair, trade.price, trade.signed_quantity());
        }
        (position, after.into_iter().cloned().collect())
    }

    /// See [`trade_logs_to_transactions`].
    #[must_use]
    pub fn to_transactions(&self) -> Transactions {
        trade_logs_to_transactions(&self.0)
    }

    /// See [`trade_log_pairs`].
    #[must_use]
    pub fn pairs(&self) -> Vec<Pair> {
        trade_log_pairs(&self.0)
    }
}

impl From<Vec<TradeLog>> for TradeLogs {
    fn from(trades: Vec<TradeLog>) -> Self {
        Self(trades)
    }
}

/// Converts fills into tape transactions keyed by order id.
#[must_use]
pub fn trade_logs_to_transactions(trades: &[TradeLog]) -> Transactions {
    trades
        .iter()
        .map(|t| Transaction::new(t.pair, t.price, t.signed_quantity(), t.time, t.order_id.clone()))
        .collect()
}

/// Distinct pairs in first-seen order.
#[must_use]
pub fn trade_log_pairs(trades: &[TradeLog]) -> Vec<Pair> {
    let mut pairs = Vec::new();
    for trade in trades {
        if !pairs.contains(&trade.pair) {
            pairs.push(trade.pair);
        }
    }
    pairs
}
