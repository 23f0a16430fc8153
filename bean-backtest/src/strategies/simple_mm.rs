//! `SimpleMm` market maker.
//!
//! Every tick the strategy pulls its resting quotes and, when the book is
//! valid, quotes one buy and one sell a fixed fraction away from mid:
//!
//! - Buy `amount` at `mid * (1 - spread)`
//! - Sell `amount` at `mid * (1 + spread)`

use bean_core::config::{BacktestConfig, StrategyConfig};
use bean_core::traits::{ExchangeViews, Strategy, TradeAction};
use bean_core::types::Pair;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::first_pair;
use crate::error::BacktestError;

/// `SimpleMm` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleMmParams {
    /// Exchange to quote on
    pub exchange: String,
    /// Quoted pair
    pub pair: Pair,
    /// Fractional distance of each quote from mid
    #[serde(default = "default_spread")]
    pub spread: f64,
    /// Quote size in coin units
    #[serde(default = "default_amount")]
    pub amount: f64,
    /// Seconds between decisions
    #[serde(default = "default_tick_secs")]
    pub tick_secs: i64,
}

fn default_spread() -> f64 {
    0.001
}

fn default_amount() -> f64 {
    0.01
}

fn default_tick_secs() -> i64 {
    60
}

impl SimpleMmParams {
    /// Parameters with default spread, amount and tick.
    #[must_use]
    pub fn new(exchange: impl Into<String>, pair: Pair) -> Self {
        Self {
            exchange: exchange.into(),
            pair,
            spread: default_spread(),
            amount: default_amount(),
            tick_secs: default_tick_secs(),
        }
    }

    /// Checks that the quotes are sane.
    pub fn validate(&self) -> Result<(), BacktestError> {
        if !(self.spread > 0.0 && self.spread < 1.0) {
            return Err(BacktestError::InvalidConfig(format!(
                "spread must be in (0, 1), got {}",
                self.spread
            )));
        }
        if !(self.amount > 0.0 && self.amount.is_finite()) {
            return Err(BacktestError::InvalidConfig(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        if self.tick_secs <= 0 {
            return Err(BacktestError::InvalidConfig(
                "tick_secs must be positive".to_string(),
            ));
        }
        if self.exchange.is_empty() {
            return Err(BacktestError::InvalidConfig(
                "exchange cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Symmetric quotes around mid on a single pair.
#[derive(Debug, Clone)]
pub struct SimpleMm {
    params: SimpleMmParams,
}

impl SimpleMm {
    /// Creates the strategy after validating `params`.
    pub fn new(params: SimpleMmParams) -> Result<Self, BacktestError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Builds the strategy from a backtest configuration, quoting its first pair.
    pub fn from_config(config: &BacktestConfig) -> Result<Self, BacktestError> {
        let StrategyConfig::SimpleMm { spread, amount } = config.strategy else {
            return Err(BacktestError::InvalidConfig(
                "strategy type is not simple_mm".to_string(),
            ));
        };
        Self::new(SimpleMmParams {
            exchange: config.exchange.clone(),
            pair: first_pair(config)?,
            spread,
            amount,
            tick_secs: config.tick().num_seconds(),
        })
    }

    /// Current parameters.
    #[must_use]
    pub const fn params(&self) -> &SimpleMmParams {
        &self.params
    }
}

impl Strategy for SimpleMm {
    fn exchange_names(&self) -> Vec<String> {
        vec![self.params.exchange.clone()]
    }

    fn pairs(&self) -> Vec<Pair> {
        vec![self.params.pair]
    }

    fn tick(&self) -> Duration {
        Duration::seconds(self.params.tick_secs)
    }

    fn grind(&mut self, exchanges: &ExchangeViews<'_>) -> Vec<TradeAction> {
        let SimpleMmParams {
            exchange: name,
            pair,
            spread,
            amount,
            ..
        } = &self.params;
        let Some(exchange) = exchanges.get(name) else {
            warn!(exchange = %name, "Exchange not available to strategy");
            return Vec::new();
        };

        let book = exchange.get_order_book(*pair);
        if !book.is_valid() {
            debug!(exchange = %name, pair = %pair, "Order book not valid, holding quotes");
            return Vec::new();
        }

        let mut actions: Vec<TradeAction> = exchange
            .get_my_orders(*pair)
            .into_iter()
            .map(|o| TradeAction::cancel(name.as_str(), *pair, o.order_id))
            .collect();

        let mid = book.mid();
        actions.push(TradeAction::place(name.as_str(), *pair, mid * (1.0 - spread), *amount));
        actions.push(TradeAction::place(name.as_str(), *pair, mid * (1.0 + spread), -amount));
        actions
    }

    fn name(&self) -> &str {
        "simple_mm"
    }

    fn format_params(&self) -> String {
        format!(
            "{} {} spread={} amount={} tick={}s",
            self.params.exchange,
            self.params.pair,
            self.params.spread,
            self.params.amount,
            self.params.tick_secs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::Simulator;
    use bean_core::data::{Order, OrderBook, OrderBookSeries, OrderBookSnapshot, Transactions};
    use bean_core::ledger::Portfolio;
    use bean_core::traits::Exchange;
    use bean_core::types::Coin;
    use chrono::{DateTime, TimeZone, Utc};

    fn create_time() -> DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000, 0).unwrap()
    }

    fn create_pair() -> Pair {
        Pair::new(Coin::Btc, Coin::Usdt)
    }

    fn create_sim(book: OrderBook) -> Simulator {
        let portfolio = Portfolio::with_balances([(Coin::Btc, 1.0), (Coin::Usdt, 10_000.0)]);
        Simulator::new("sim", create_time(), portfolio).with_pair(
            create_pair(),
            OrderBookSeries::new(vec![OrderBookSnapshot::new(create_time(), book)]),
            Transactions::default(),
        )
    }

    fn create_book() -> OrderBook {
        OrderBook::new(vec![Order::new(99.0, 1.0)], vec![Order::new(101.0, 1.0)])
    }

    fn create_strategy() -> SimpleMm {
        let params = SimpleMmParams {
            spread: 0.01,
            amount: 0.5,
            ..SimpleMmParams::new("sim", create_pair())
        };
        SimpleMm::new(params).unwrap()
    }

    fn views(sim: &Simulator) -> ExchangeViews<'_> {
        ExchangeViews::from([(sim.name().to_string(), sim as &dyn Exchange)])
    }

    #[test]
    fn test_quotes_around_mid() {
        let sim = create_sim(create_book());
        let actions = create_strategy().grind(&views(&sim));
        assert_eq!(
            actions,
            vec![
                TradeAction::place("sim", create_pair(), 99.0, 0.5),
                TradeAction::place("sim", create_pair(), 101.0, -0.5),
            ]
        );
    }

    #[test]
    fn test_requote_cancels_resting() {
        let mut sim = create_sim(create_book());
        let id = sim.place_limit_order(create_pair(), 99.0, 0.5).unwrap();
        let actions = create_strategy().grind(&views(&sim));
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0], TradeAction::cancel("sim", create_pair(), id));
    }

    #[test]
    fn test_invalid_book_or_missing_exchange() {
        let sim = create_sim(OrderBook::new(vec![], vec![Order::new(101.0, 1.0)]));
        assert!(create_strategy().grind(&views(&sim)).is_empty());
        assert!(create_strategy().grind(&ExchangeViews::new()).is_empty());
    }

    #[test]
    fn test_validate() {
        let mut params = SimpleMmParams::new("sim", create_pair());
        assert!(params.validate().is_ok());
        params.spread = 0.0;
        assert!(matches!(params.validate(), Err(BacktestError::InvalidConfig(_))));
        params.spread = 0.01;
        params.amount = -1.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_strategy_surface() {
        let s = create_strategy();
        assert_eq!(s.name(), "simple_mm");
        assert_eq!(s.tick(), Duration::seconds(60));
        assert_eq!(s.pairs(), vec![create_pair()]);
        assert_eq!(s.exchange_names(), vec!["sim".to_string()]);
        assert!(s.format_params().contains("spread=0.01"));
    }
}
