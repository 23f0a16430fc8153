//! Strategy contract and the actions strategies emit.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ExchangeViews;
use crate::types::Pair;

/// An instruction from a strategy to one exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TradeAction {
    /// Place a limit order; positive `amount` buys.
    PlaceLimitOrder {
        /// Target exchange name
        exchange: String,
        /// Pair to trade
        pair: Pair,
        /// Limit price
        price: f64,
        /// Signed size
        amount: f64,
    },
    /// Cancel a resting order.
    CancelOpenOrder {
        /// Target exchange name
        exchange: String,
        /// Pair the order rests on
        pair: Pair,
        /// Exchange order id
        order_id: String,
    },
}

impl TradeAction {
    /// Shorthand for [`TradeAction::PlaceLimitOrder`].
    #[must_use]
    pub fn place(exchange: impl Into<String>, pair: Pair, price: f64, amount: f64) -> Self {
        Self::PlaceLimitOrder {
            exchange: exchange.into(),
            pair,
            price,
            amount,
        }
    }

    /// Shorthand for [`TradeAction::CancelOpenOrder`].
    #[must_use]
    pub fn cancel(exchange: impl Into<String>, pair: Pair, order_id: impl Into<String>) -> Self {
        Self::CancelOpenOrder {
            exchange: exchange.into(),
            pair,
            order_id: order_id.into(),
        }
    }

    /// Exchange the action is routed to.
    #[must_use]
    pub fn exchange(&self) -> &str {
        match self {
            Self::PlaceLimitOrder { exchange, .. } | Self::CancelOpenOrder { exchange, .. } => {
                exchange
            }
        }
    }

    /// Pair the action applies to.
    #[must_use]
    pub const fn pair(&self) -> Pair {
        match self {
            Self::PlaceLimitOrder { pair, .. } | Self::CancelOpenOrder { pair, .. } => *pair,
        }
    }

    /// Compact rendering for logs and chat, e.g. `b[BTCUSDT]:sim 9000.00 0.5`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::PlaceLimitOrder {
                exchange,
                pair,
                price,
                amount,
            } => {
                let side = if *amount > 0.0 { 'b' } else { 's' };
                let venue: String = exchange.chars().take(3).collect();
                format!(
                    "{side}[{pair}]:{venue} {} {}",
                    pair.format_price(*price),
                    (amount * 100.0).round() / 100.0
                )
            }
            Self::CancelOpenOrder {
                exchange,
                pair,
                order_id,
            } => {
                let venue: String = exchange.chars().take(2).collect();
                format!("{venue} Cancel order {pair} {order_id}")
            }
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// A [`TradeAction`] stamped with the simulated time it was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedAction {
    /// When the action was applied
    pub time: DateTime<Utc>,
    /// The action
    pub action: TradeAction,
}

/// A trading strategy driven at a fixed tick.
///
/// The same implementation runs against live exchanges and the simulator.
pub trait Strategy {
    /// Exchanges the strategy trades on.
    fn exchange_names(&self) -> Vec<String>;

    /// Pairs the strategy needs data for.
    fn pairs(&self) -> Vec<Pair>;

    /// Time between successive [`Strategy::grind`] calls.
    fn tick(&self) -> Duration;

    /// Decides what to do now. Actions are applied in the returned order.
    fn grind(&mut self, exchanges: &ExchangeViews<'_>) -> Vec<TradeAction>;

    /// Name for reports.
    fn name(&self) -> &str {
        "bean"
    }

    /// Compact rendering of the key parameters.
    fn format_params(&self) -> String {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coin;

    fn create_pair() -> Pair {
        Pair::new(Coin::Btc, Coin::Usdt)
    }

    #[test]
    fn test_describe_place() {
        let buy = TradeAction::place("sim", create_pair(), 9000.123, 0.5);
        assert_eq!(buy.describe(), "b[BTCUSDT]:sim 9000.12 0.5");
        let sell = TradeAction::place("binance", create_pair(), 9000.0, -0.256);
        assert_eq!(sell.describe(), "s[BTCUSDT]:bin 9000.00 -0.26");
    }

    #[test]
    fn test_describe_cancel() {
        let cancel = TradeAction::cancel("sim", create_pair(), "7");
        assert_eq!(cancel.describe(), "si Cancel order BTCUSDT 7");
        assert_eq!(cancel.exchange(), "sim");
        assert_eq!(cancel.pair(), create_pair());
    }

    #[test]
    fn test_serde_tagged() {
        let action = TradeAction::cancel("sim", create_pair(), "7");
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["op"], "cancel_open_order");
        assert_eq!(json["pair"], "BTC/USDT");
        let back: TradeAction = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);
    }
}
