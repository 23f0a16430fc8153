//! `OrderScan` strategy.
//!
//! Tracks large orders that keep resting at the same price across ticks.
//! Orders that move or vanish are taken to be other market makers and are
//! forgotten. Once a resting order is old enough and close to the touch,
//! the strategy quotes a little ahead of it and flattens its position at
//! mid when nothing worth leaning on is left.

use bean_core::config::{BacktestConfig, StrategyConfig};
use bean_core::data::Order;
use bean_core::traits::{ExchangeViews, Strategy, TradeAction};
use bean_core::types::Pair;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::first_pair;
use crate::error::BacktestError;

/// A level seen on consecutive ticks at the same price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaticOrder {
    /// Level price
    pub price: f64,
    /// Amount at the last sighting
    pub amount: f64,
    /// Consecutive ticks the level has been seen
    pub age: u32,
}

/// `OrderScan` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderScanParams {
    /// Exchange to trade on
    pub exchange: String,
    /// Traded pair
    pub pair: Pair,
    /// Seconds between decisions
    pub tick_secs: i64,
    /// Largest absolute position
    pub trading_amount: f64,
    /// Levels at or below this amount are not tracked
    pub threshold: f64,
    /// How far ahead of a static order to quote
    pub distance: f64,
    /// Static orders further than this from the touch are ignored
    pub too_far: f64,
    /// Ticks a level must survive beyond before it is leaned on
    pub min_age: u32,
}

impl OrderScanParams {
    /// Parameters with the default threshold, distance and age.
    #[must_use]
    pub fn new(exchange: impl Into<String>, pair: Pair) -> Self {
        Self {
            exchange: exchange.into(),
            pair,
            tick_secs: 60,
            trading_amount: 1.0,
            threshold: 10.0,
            distance: 2.0,
            too_far: 10.0,
            min_age: 2,
        }
    }

    /// Checks sizes and distances are positive.
    pub fn validate(&self) -> Result<(), BacktestError> {
        if self.exchange.is_empty() {
            return Err(BacktestError::InvalidConfig(
                "exchange cannot be empty".to_string(),
            ));
        }
        if self.tick_secs <= 0 {
            return Err(BacktestError::InvalidConfig(
                "tick_secs must be positive".to_string(),
            ));
        }
        for (field, value) in [
            ("trading_amount", self.trading_amount),
            ("distance", self.distance),
            ("too_far", self.too_far),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(BacktestError::InvalidConfig(format!(
                    "{field} must be positive, got {value}"
                )));
            }
        }
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(BacktestError::InvalidConfig(format!(
                "threshold cannot be negative, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Merges this tick's levels of one side into the tracked static orders.
///
/// `ascending` is true for asks. Both `tracked` and `levels` run from the
/// touch outwards. A tracked order seen again at the same price is replaced
/// by the new level, one tick older, or dropped once the level shrinks to
/// `threshold` or below. Tracked orders inside the new touch were executed
/// and tracked orders between new levels were cancelled; both are dropped.
/// Tracked orders beyond the last new level are kept. An empty `levels`
/// leaves `tracked` untouched.
#[must_use]
pub fn merge_orders(
    ascending: bool,
    threshold: f64,
    tracked: &[StaticOrder],
    levels: &[Order],
) -> Vec<StaticOrder> {
    let Some(touch) = levels.first() else {
        return tracked.to_vec();
    };
    let inside = |price: f64, level: f64| {
        if ascending { price < level } else { price > level }
    };

    let mut merged = Vec::with_capacity(tracked.len().max(levels.len()));
    let mut i = tracked.iter().take_while(|o| inside(o.price, touch.price)).count();
    for level in levels {
        while i < tracked.len() && inside(tracked[i].price, level.price) {
            i += 1;
        }
        let previous_age = match tracked.get(i) {
            Some(o) if o.price == level.price => {
                i += 1;
                Some(o.age)
            }
            _ => None,
        };
        if level.amount > threshold {
            merged.push(StaticOrder {
                price: level.price,
                amount: level.amount,
                age: previous_age.map_or(1, |age| age + 1),
            });
        }
    }
    merged.extend_from_slice(tracked.get(i..).unwrap_or_default());
    merged
}

/// First tracked order older than `min_age` within `too_far` of `reference`.
fn near_static_order(
    tracked: &[StaticOrder],
    min_age: u32,
    reference: f64,
    too_far: f64,
) -> Option<StaticOrder> {
    tracked
        .iter()
        .find(|o| o.age > min_age && (o.price - reference).abs() < too_far)
        .copied()
}

/// Trades ahead of large orders that stay put.
#[derive(Debug, Clone)]
pub struct OrderScan {
    params: OrderScanParams,
    static_bids: Vec<StaticOrder>,
    static_asks: Vec<StaticOrder>,
}

impl OrderScan {
    /// Creates the strategy after validating `params`.
    pub fn new(params: OrderScanParams) -> Result<Self, BacktestError> {
        params.validate()?;
        Ok(Self {
            params,
            static_bids: Vec::new(),
            static_asks: Vec::new(),
        })
    }

    /// Builds the strategy from a backtest configuration, trading its first pair.
    pub fn from_config(config: &BacktestConfig) -> Result<Self, BacktestError> {
        let StrategyConfig::OrderScan { trading_amount } = config.strategy else {
            return Err(BacktestError::InvalidConfig(
                "strategy type is not order_scan".to_string(),
            ));
        };
        Self::new(OrderScanParams {
            tick_secs: config.tick().num_seconds(),
            trading_amount,
            ..OrderScanParams::new(config.exchange.clone(), first_pair(config)?)
        })
    }

    /// Current parameters.
    #[must_use]
    pub const fn params(&self) -> &OrderScanParams {
        &self.params
    }

    /// Tracked bid levels, best first.
    #[must_use]
    pub fn static_bids(&self) -> &[StaticOrder] {
        &self.static_bids
    }

    /// Tracked ask levels, best first.
    #[must_use]
    pub fn static_asks(&self) -> &[StaticOrder] {
        &self.static_asks
    }
}

impl Strategy for OrderScan {
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
        let name = self.params.exchange.as_str();
        let pair = self.params.pair;
        let Some(exchange) = exchanges.get(name) else {
            warn!(exchange = %name, "Exchange not available to strategy");
            return Vec::new();
        };

        let book = exchange.get_order_book(pair);
        if !book.is_valid() {
            debug!(exchange = %name, pair = %pair, "Order book not valid, holding orders");
            return Vec::new();
        }

        let mut actions: Vec<TradeAction> = exchange
            .get_my_orders(pair)
            .into_iter()
            .map(|o| TradeAction::cancel(name, pair, o.order_id))
            .collect();
        let position = exchange.get_portfolio().balance(pair.coin);

        let p = &self.params;
        self.static_asks = merge_orders(true, p.threshold, &self.static_asks, book.asks());
        self.static_bids = merge_orders(false, p.threshold, &self.static_bids, book.bids());

        let touch = book.price_in(p.trading_amount);
        let (trading_bid, trading_ask) = (touch.bid.price, touch.ask.price);
        let mut near_bid = near_static_order(&self.static_bids, p.min_age, trading_bid, p.too_far);
        let mut near_ask = near_static_order(&self.static_asks, p.min_age, trading_ask, p.too_far);

        if let (Some(bid), Some(ask)) = (near_bid, near_ask) {
            let bid_vicinity = trading_bid - bid.price;
            let ask_vicinity = ask.price - trading_ask;
            if bid_vicinity < p.distance && ask_vicinity < p.distance {
                near_bid = None;
                near_ask = None;
            } else if bid_vicinity < ask_vicinity {
                near_ask = None;
            } else {
                near_bid = None;
            }
        }

        debug!(
            pair = %pair,
            position,
            static_bid = ?near_bid,
            static_ask = ?near_ask,
            "Order scan"
        );

        match (near_bid, near_ask) {
            (Some(bid), None) if position < p.trading_amount => {
                let price = (bid.price + p.distance).min(trading_ask);
                actions.push(TradeAction::place(name, pair, price, p.trading_amount - position));
            }
            (None, Some(ask)) if position > -p.trading_amount => {
                let price = (ask.price - p.distance).max(trading_bid);
                actions.push(TradeAction::place(name, pair, price, position - p.trading_amount));
            }
            (None, None) if position != 0.0 => {
                let mid = (trading_bid + trading_ask) / 2.0;
                actions.push(TradeAction::place(name, pair, mid, -position));
            }
            _ => {}
        }
        actions
    }

    fn name(&self) -> &str {
        "order_scan"
    }

    fn format_params(&self) -> String {
        let p = &self.params;
        format!(
            "{} {} amount={} threshold={} distance={} too_far={} min_age={} tick={}s",
            p.exchange,
            p.pair,
            p.trading_amount,
            p.threshold,
            p.distance,
            p.too_far,
            p.min_age,
            p.tick_secs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::run;
    use crate::simulator::Simulator;
    use bean_core::data::{OrderBook, OrderBookSeries, OrderBookSnapshot, Transactions};
    use bean_core::ledger::Portfolio;
    use bean_core::traits::Exchange;
    use bean_core::types::Coin;
    use chrono::{DateTime, TimeZone, Utc};

    fn create_time(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000 + secs, 0).unwrap()
    }

    fn create_pair() -> Pair {
        Pair::new(Coin::Btc, Coin::Usdt)
    }

    fn create_sim(btc: f64) -> Simulator {
        let book = OrderBook::new(
            vec![Order::new(99.0, 1.0), Order::new(95.0, 20.0)],
            vec![Order::new(101.0, 1.0), Order::new(110.0, 5.0)],
        );
        let portfolio = Portfolio::with_balances([(Coin::Btc, btc), (Coin::Usdt, 10_000.0)]);
        Simulator::new("sim", create_time(0), portfolio).with_pair(
            create_pair(),
            OrderBookSeries::new(vec![OrderBookSnapshot::new(create_time(0), book)]),
            Transactions::default(),
        )
    }

    fn create_strategy() -> OrderScan {
        OrderScan::new(OrderScanParams {
            tick_secs: 10,
            trading_amount: 0.5,
            ..OrderScanParams::new("sim", create_pair())
        })
        .unwrap()
    }

    fn views(sim: &Simulator) -> ExchangeViews<'_> {
        ExchangeViews::from([(sim.name().to_string(), sim as &dyn Exchange)])
    }

    fn create_static(price: f64, amount: f64, age: u32) -> StaticOrder {
        StaticOrder { price, amount, age }
    }

    #[test]
    fn test_merge_orders_ages_and_drops() {
        let tracked = vec![create_static(101.0, 20.0, 3), create_static(105.0, 15.0, 1)];
        let levels = vec![
            Order::new(101.0, 25.0),
            Order::new(102.0, 5.0),
            Order::new(103.0, 12.0),
        ];
        assert_eq!(
            merge_orders(true, 10.0, &tracked, &levels),
            vec![
                create_static(101.0, 25.0, 4),
                create_static(103.0, 12.0, 1),
                create_static(105.0, 15.0, 1),
            ]
        );

        // a tracked ask inside the new touch was lifted
        let tracked = vec![create_static(100.0, 30.0, 5), create_static(101.0, 20.0, 2)];
        let merged = merge_orders(true, 10.0, &tracked, &levels);
        assert_eq!(merged[0], create_static(101.0, 25.0, 3));
        assert!(merged.iter().all(|o| o.price != 100.0));

        // tracked 104 sat between new levels and is gone
        let tracked = vec![create_static(104.0, 30.0, 5)];
        let levels = vec![Order::new(103.0, 12.0), Order::new(106.0, 12.0)];
        assert_eq!(
            merge_orders(true, 10.0, &tracked, &levels),
            vec![create_static(103.0, 12.0, 1), create_static(106.0, 12.0, 1)]
        );
    }

    #[test]
    fn test_merge_orders_bids_and_empty_side() {
        let tracked = vec![create_static(95.0, 20.0, 1), create_static(90.0, 50.0, 4)];
        let levels = vec![Order::new(99.0, 1.0), Order::new(95.0, 22.0)];
        assert_eq!(
            merge_orders(false, 10.0, &tracked, &levels),
            vec![create_static(95.0, 22.0, 2), create_static(90.0, 50.0, 4)]
        );
        assert_eq!(merge_orders(false, 10.0, &tracked, &[]), tracked);

        // the last level shrank below the threshold, so it is no longer tracked
        let levels = vec![Order::new(99.0, 1.0), Order::new(95.0, 3.0)];
        assert_eq!(
            merge_orders(false, 10.0, &tracked, &levels),
            vec![create_static(90.0, 50.0, 4)]
        );
    }

    #[test]
    fn test_near_static_order() {
        let tracked = vec![create_static(98.0, 20.0, 2), create_static(95.0, 20.0, 3)];
        assert_eq!(near_static_order(&tracked, 2, 99.0, 10.0), Some(tracked[1]));
        assert_eq!(near_static_order(&tracked, 2, 99.0, 4.0), None);
        assert_eq!(near_static_order(&tracked, 1, 99.0, 4.0), Some(tracked[0]));
    }

    #[test]
    fn test_flattens_at_mid_without_static_orders() {
        let sim = create_sim(0.3);
        let actions = create_strategy().grind(&views(&sim));
        assert_eq!(actions, vec![TradeAction::place("sim", create_pair(), 100.0, -0.3)]);
    }

    #[test]
    fn test_leans_on_static_bid_after_min_age() {
        let sim = create_sim(0.0);
        let mut strategy = create_strategy();
        assert!(strategy.grind(&views(&sim)).is_empty());
        assert!(strategy.grind(&views(&sim)).is_empty());
        assert_eq!(strategy.static_bids(), &[create_static(95.0, 20.0, 2)]);
        assert!(strategy.static_asks().is_empty());
        assert_eq!(
            strategy.grind(&views(&sim)),
            vec![TradeAction::place("sim", create_pair(), 97.0, 0.5)]
        );
    }

    #[test]
    fn test_invalid_book_keeps_state() {
        let sim = Simulator::new("sim", create_time(0), Portfolio::new()).with_pair(
            create_pair(),
            OrderBookSeries::new(vec![OrderBookSnapshot::new(
                create_time(0),
                OrderBook::new(vec![Order::new(95.0, 20.0)], vec![]),
            )]),
            Transactions::default(),
        );
        let mut strategy = create_strategy();
        assert!(strategy.grind(&views(&sim)).is_empty());
        assert!(strategy.static_bids().is_empty());
        assert!(strategy.grind(&ExchangeViews::new()).is_empty());
    }

    #[test]
    fn test_validate_and_config_mismatch() {
        assert!(OrderScanParams::new("sim", create_pair()).validate().is_ok());
        let params = OrderScanParams {
            distance: 0.0,
            ..OrderScanParams::new("sim", create_pair())
        };
        assert!(matches!(OrderScan::new(params), Err(BacktestError::InvalidConfig(_))));
        let params = OrderScanParams {
            threshold: -1.0,
            ..OrderScanParams::new("sim", create_pair())
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_run_places_ahead_of_static_bid() {
        let mut sims = vec![create_sim(0.0)];
        let mut strategy = create_strategy();
        let result = run(&mut strategy, &mut sims, create_time(0), create_time(30)).unwrap();

        assert_eq!(result.strategy, "order_scan");
        assert!(result.transactions.is_empty());
        let actions = sims[0].actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].time, create_time(20));
        assert_eq!(
            actions[0].action,
            TradeAction::place("sim", create_pair(), 97.0, 0.5)
        );
    }
}
