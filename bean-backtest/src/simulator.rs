//! Historical replay exchange.
//!
//! A [`Simulator`] answers the [`Exchange`] contract from recorded order
//! books and trades. Time only moves when the driver calls
//! [`Simulator::set_time`]; each call first matches resting orders against
//! the book valid at the old time, then fills any remainder against the
//! tape printed between the old and the new time.

use bean_core::data::{
    Order, OrderBook, OrderBookSeries, OrderState, OrderStatus, Side, Transaction, Transactions,
};
use bean_core::error::ExchangeError;
use bean_core::ledger::Portfolio;
use bean_core::traits::{Exchange, HistoricalDataProvider, TimedAction, TradeAction};
use bean_core::types::{Coin, Pair};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::error::BacktestError;

/// Trailing window served by [`Exchange::get_transaction_history`], seconds.
pub const TRANSACTION_HISTORY_SECS: i64 = 600;

/// Relative tolerance under which a remaining amount counts as filled.
const FILL_EPSILON: f64 = 1e-9;

/// A resting order inside the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct SimOrder {
    /// Simulator order id
    pub id: String,
    /// Rounded limit price
    pub price: f64,
    /// Signed amount still resting
    pub amount: f64,
    /// Unsigned amount filled so far
    pub filled: f64,
    /// Lifecycle state
    pub state: OrderState,
    /// Simulated placement time
    pub placed_at: DateTime<Utc>,
}

impl SimOrder {
    fn status(&self) -> OrderStatus {
        OrderStatus {
            order_id: self.id.clone(),
            placed_time: self.placed_at,
            side: Side::from_amount(self.amount),
            filled_amount: self.filled,
            left_amount: self.amount.abs(),
            placed_price: self.price,
            price: self.price,
            state: self.state,
            commission: 0.0,
            commission_asset: None,
        }
    }
}

/// Replays one venue's history.
#[derive(Debug, Clone)]
pub struct Simulator {
    name: String,
    now: DateTime<Utc>,
    last: DateTime<Utc>,
    order_books: HashMap<Pair, OrderBookSeries>,
    tapes: HashMap<Pair, Transactions>,
    orders: BTreeMap<Pair, Vec<SimOrder>>,
    actions: Vec<TimedAction>,
    trades: Transactions,
    next_id: u64,
    portfolio: Portfolio,
}

impl Simulator {
    /// A simulator at `start` with no market data.
    #[must_use]
    pub fn new(name: impl Into<String>, start: DateTime<Utc>, portfolio: Portfolio) -> Self {
        Self {
            name: name.into(),
            now: start,
            last: start,
            order_books: HashMap::new(),
            tapes: HashMap::new(),
            orders: BTreeMap::new(),
            actions: Vec::new(),
            trades: Transactions::default(),
            next_id: 0,
            portfolio,
        }
    }

    /// Loads `pairs` for `[start, end]` from `provider`, books cut to `depth`.
    pub fn from_provider(
        name: impl Into<String>,
        provider: &dyn HistoricalDataProvider,
        pairs: &[Pair],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        depth: usize,
        portfolio: Portfolio,
    ) -> Result<Self, BacktestError> {
        let mut sim = Self::new(name, start, portfolio);
        for &pair in pairs {
            let series = provider.order_book_series(pair, start, end, depth)?;
            let tape = provider.transactions(pair, start, end)?;
            if series.is_empty() {
                warn!(exchange = %sim.name, pair = %pair, "No order book data in window");
            }
            sim.load_pair(pair, series, tape);
        }
        info!(
            exchange = %sim.name,
            pairs = pairs.len(),
            start = %start,
            end = %end,
            "Simulator constructed"
        );
        Ok(sim)
    }

    /// Installs the history of `pair`, replacing any previous data.
    pub fn load_pair(&mut self, pair: Pair, series: OrderBookSeries, tape: Transactions) {
        self.order_books.insert(pair, series);
        self.tapes.insert(pair, tape.sorted());
        self.orders.entry(pair).or_default();
    }

    /// Builder form of [`Simulator::load_pair`].
    #[must_use]
    pub fn with_pair(mut self, pair: Pair, series: OrderBookSeries, tape: Transactions) -> Self {
        self.load_pair(pair, series, tape);
        self
    }

    /// Current simulated time.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Simulated time before the last [`Simulator::set_time`].
    #[must_use]
    pub const fn last(&self) -> DateTime<Utc> {
        self.last
    }

    /// Pairs with loaded data.
    #[must_use]
    pub fn pairs(&self) -> Vec<Pair> {
        self.orders.keys().copied().collect()
    }

    /// Every place and cancel request, stamped with the simulated time.
    #[must_use]
    pub fn actions(&self) -> &[TimedAction] {
        &self.actions
    }

    /// Fills generated so far.
    #[must_use]
    pub const fn trades(&self) -> &Transactions {
        &self.trades
    }

    /// All orders of `pair` in placement order, finished ones included.
    #[must_use]
    pub fn orders(&self, pair: Pair) -> &[SimOrder] {
        self.orders.get(&pair).map(Vec::as_slice).unwrap_or_default()
    }

    /// The account restricted to `coins`.
    #[must_use]
    pub fn get_portfolio_by_coins(&self, coins: &[Coin]) -> Portfolio {
        self.portfolio.filter(coins)
    }

    /// Drops orders, actions and fills and installs `portfolio` at `start`.
    /// Loaded history is kept.
    pub fn reset(&mut self, portfolio: Portfolio, start: DateTime<Utc>) {
        for orders in self.orders.values_mut() {
            orders.clear();
        }
        self.actions.clear();
        self.trades = Transactions::default();
        self.next_id = 0;
        self.portfolio = portfolio;
        self.now = start;
        self.last = start;
    }

    /// Advances the clock to `t`, filling resting orders on the way.
    ///
    /// Book fills come first, at the book's prices; the remainder fills
    /// against prints in `(now, t]` that cross the order, at the order's
    /// price. Every fill is recorded at `t`.
    pub fn set_time(&mut self, t: DateTime<Utc>) {
        let Self {
            name,
            now,
            last,
            order_books,
            tapes,
            orders,
            trades,
            portfolio,
            ..
        } = self;

        for (pair, pair_orders) in orders.iter_mut() {
            let pair = *pair;
            let book = order_books.get(&pair).map(|series| series.book_at(*now));
            let recent = tapes
                .get(&pair)
                .map(|tape| tape.between(*now, t))
                .unwrap_or_default();

            for order in pair_orders.iter_mut().filter(|o| o.state == OrderState::Alive) {
                let book_fill = book.map_or(Order::new(0.0, 0.0), |b| {
                    b.match_order(Order::new(order.price, order.amount))
                });
                let mut tape_fill = 0.0;
                if (book_fill.amount - order.amount).abs() > 0.0 {
                    tape_fill = recent.fill(order.price, order.amount - book_fill.amount);
                }

                let fill = book_fill.amount + tape_fill;
                if fill == 0.0 {
                    continue;
                }
                let fill_price = (book_fill.price * book_fill.amount + order.price * tape_fill) / fill;

                release_locked(portfolio, pair, order.price, fill);
                portfolio.apply_fill(pair, fill_price, fill);

                order.filled += fill.abs();
                order.amount -= fill;
                if order.amount.abs() <= FILL_EPSILON * order.filled.max(1.0) {
                    order.amount = 0.0;
                    order.state = OrderState::Filled;
                }

                let txn_id = trades.len().to_string();
                debug!(
                    exchange = %name,
                    pair = %pair,
                    order_id = %order.id,
                    price = fill_price,
                    amount = fill,
                    state = %order.state,
                    "Order filled"
                );
                trades.push(Transaction::new(pair, fill_price, fill, t, txn_id));
            }
        }

        *last = *now;
        *now = t;
    }
}

/// Releases the collateral reserved for `amount` of an order at `price`.
fn release_locked(portfolio: &mut Portfolio, pair: Pair, price: f64, amount: f64) {
    if amount > 0.0 {
        portfolio.add_locked_balance(pair.base, -(price * amount.abs()));
    } else {
        portfolio.add_locked_balance(pair.coin, -amount.abs());
    }
}

impl Exchange for Simulator {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_order_book(&self, pair: Pair) -> OrderBook {
        self.order_books
            .get(&pair)
            .map_or(OrderBook::EMPTY, |series| series.book_at(self.now).clone())
    }

    fn get_transaction_history(&self, pair: Pair) -> Transactions {
        self.tapes
            .get(&pair)
            .map(|tape| tape.between(self.now - Duration::seconds(TRANSACTION_HISTORY_SECS), self.now))
            .unwrap_or_default()
    }

    fn get_portfolio(&self) -> Portfolio {
        self.portfolio.clone()
    }

    fn place_limit_order(
        &mut self,
        pair: Pair,
        price: f64,
        amount: f64,
    ) -> Result<String, ExchangeError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(ExchangeError::invalid_order("price", format!("{price} is not a positive number")));
        }
        if !amount.is_finite() || amount == 0.0 {
            return Err(ExchangeError::invalid_order("amount", format!("{amount} is not a non-zero number")));
        }
        let price = pair.round_price(price)?;

        self.actions.push(TimedAction {
            time: self.now,
            action: TradeAction::place(self.name.clone(), pair, price, amount),
        });

        let id = self.next_id.to_string();
        self.next_id += 1;
        self.orders.entry(pair).or_default().push(SimOrder {
            id: id.clone(),
            price,
            amount,
            filled: 0.0,
            state: OrderState::Alive,
            placed_at: self.now,
        });

        if amount > 0.0 {
            self.portfolio.add_locked_balance(pair.base, price * amount.abs());
        } else {
            self.portfolio.add_locked_balance(pair.coin, amount.abs());
        }
        debug!(exchange = %self.name, pair = %pair, order_id = %id, price, amount, "Order placed");
        Ok(id)
    }

    fn cancel_order(&mut self, pair: Pair, order_id: &str) -> Result<(), ExchangeError> {
        self.actions.push(TimedAction {
            time: self.now,
            action: TradeAction::cancel(self.name.clone(), pair, order_id),
        });

        let order = self
            .orders
            .get_mut(&pair)
            .and_then(|orders| orders.iter_mut().find(|o| o.id == order_id));
        match order {
            Some(order) if order.state == OrderState::Alive => {
                order.state = OrderState::Cancelled;
                release_locked(&mut self.portfolio, pair, order.price, order.amount);
                debug!(exchange = %self.name, pair = %pair, order_id, "Order cancelled");
            }
            _ => debug!(exchange = %self.name, pair = %pair, order_id, "Cancel ignored"),
        }
        Ok(())
    }

    fn get_my_orders(&self, pair: Pair) -> Vec<OrderStatus> {
        self.orders(pair)
            .iter()
            .filter(|o| o.state == OrderState::Alive)
            .map(SimOrder::status)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bean_core::data::OrderBookSnapshot;
    use chrono::TimeZone;

    fn create_time(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000 + secs, 0).unwrap()
    }

    fn create_pair() -> Pair {
        Pair::new(Coin::Btc, Coin::Usdt)
    }

    fn create_series() -> OrderBookSeries {
        OrderBookSeries::new(vec![OrderBookSnapshot::new(
            create_time(0),
            OrderBook::new(
                vec![Order::new(99.0, 1.0), Order::new(98.0, 2.0)],
                vec![Order::new(101.0, 1.0), Order::new(102.0, 1.0)],
            ),
        )])
    }

    fn create_print(secs: i64, price: f64, amount: f64) -> Transaction {
        Transaction::new(create_pair(), price, amount, create_time(secs), secs.to_string())
    }

    fn create_sim(tape: Vec<Transaction>) -> Simulator {
        let portfolio = Portfolio::with_balances([(Coin::Btc, 10.0), (Coin::Usdt, 10_000.0)]);
        Simulator::new("sim", create_time(0), portfolio).with_pair(
            create_pair(),
            create_series(),
            Transactions::new(tape),
        )
    }

    fn assert_locked_consistent(sim: &Simulator) {
        let p = sim.get_portfolio();
        for coin in [Coin::Btc, Coin::Usdt] {
            let diff = p.balance(coin) - p.locked_balance(coin) - p.available_balance(coin);
            assert!(diff.abs() < 1e-9);
            assert!(p.locked_balance(coin) >= -1e-9);
            assert!(p.locked_balance(coin) <= p.balance(coin) + 1e-9);
        }
    }

    #[test]
    fn test_tape_fill_at_order_price() {
        let mut sim = create_sim(vec![create_print(30, 99.0, -1.0)]);
        sim.place_limit_order(create_pair(), 100.0, 1.0).unwrap();
        sim.set_time(create_time(60));

        let trades = sim.trades();
        assert_eq!(trades.len(), 1);
        let fill = &trades.as_slice()[0];
        assert!((fill.price - 100.0).abs() < 1e-12);
        assert!((fill.amount - 1.0).abs() < 1e-12);
        assert_eq!(fill.timestamp, create_time(60));
        assert_eq!(sim.orders(create_pair())[0].state, OrderState::Filled);
        assert!(sim.get_my_orders(create_pair()).is_empty());

        let p = sim.get_portfolio();
        assert!((p.balance(Coin::Btc) - 11.0).abs() < 1e-12);
        assert!((p.balance(Coin::Usdt) - 9_900.0).abs() < 1e-9);
        assert!(p.locked_balance(Coin::Usdt).abs() < 1e-9);
    }

    #[test]
    fn test_book_then_tape_blend() {
        let mut sim = create_sim(vec![create_print(30, 100.0, 0.5)]);
        sim.place_limit_order(create_pair(), 101.5, 2.0).unwrap();
        sim.set_time(create_time(60));

        // 1 at 101 from the book, 0.5 at 101.5 from the tape
        let fill = &sim.trades().as_slice()[0];
        assert!((fill.amount - 1.5).abs() < 1e-12);
        assert!((fill.price - (101.0 + 0.5 * 101.5) / 1.5).abs() < 1e-9);

        let open = sim.get_my_orders(create_pair());
        assert_eq!(open.len(), 1);
        assert!((open[0].left_amount - 0.5).abs() < 1e-12);
        assert!((open[0].filled_amount - 1.5).abs() < 1e-12);
        assert_locked_consistent(&sim);
        assert!((sim.get_portfolio().locked_balance(Coin::Usdt) - 0.5 * 101.5).abs() < 1e-9);
    }

    #[test]
    fn test_sell_locks_coin() {
        let mut sim = create_sim(vec![create_print(30, 105.0, 0.4)]);
        sim.place_limit_order(create_pair(), 104.0, -1.0).unwrap();
        assert!((sim.get_portfolio().locked_balance(Coin::Btc) - 1.0).abs() < 1e-12);
        sim.set_time(create_time(60));
        let p = sim.get_portfolio();
        assert!((p.locked_balance(Coin::Btc) - 0.6).abs() < 1e-12);
        assert!((p.balance(Coin::Usdt) - (10_000.0 + 0.4 * 104.0)).abs() < 1e-9);
        assert_eq!(sim.get_my_orders(create_pair())[0].side, Side::Sell);
    }

    #[test]
    fn test_no_look_ahead() {
        let mut sim = create_sim(vec![create_print(30, 50.0, 1.0), create_print(90, 50.0, 1.0)]);
        sim.set_time(create_time(60));
        let history = sim.get_transaction_history(create_pair());
        assert_eq!(history.len(), 1);
        assert!(history.iter().all(|t| t.timestamp <= sim.now()));
        assert!(sim.get_order_book(create_pair()).is_valid());

        let before = Simulator::new("sim", create_time(-10), Portfolio::new()).with_pair(
            create_pair(),
            create_series(),
            Transactions::default(),
        );
        assert!(before.get_order_book(create_pair()).bids().is_empty());
    }

    #[test]
    fn test_cancel_releases_and_ignores_unknown() {
        let mut sim = create_sim(vec![]);
        let id = sim.place_limit_order(create_pair(), 90.0, 2.0).unwrap();
        assert!((sim.get_portfolio().locked_balance(Coin::Usdt) - 180.0).abs() < 1e-9);

        sim.cancel_order(create_pair(), &id).unwrap();
        assert_eq!(sim.orders(create_pair())[0].state, OrderState::Cancelled);
        assert!(sim.get_portfolio().locked_balance(Coin::Usdt).abs() < 1e-9);

        sim.cancel_order(create_pair(), &id).unwrap();
        sim.cancel_order(create_pair(), "nope").unwrap();
        assert!(sim.get_portfolio().locked_balance(Coin::Usdt).abs() < 1e-9);
        assert_eq!(sim.actions().len(), 4);
    }

    #[test]
    fn test_locked_accounting_over_sequence() {
        let tape = vec![
            create_print(10, 97.0, -0.3),
            create_print(70, 103.0, 0.7),
            create_print(130, 96.0, -5.0),
        ];
        let mut sim = create_sim(tape);
        let a = sim.place_limit_order(create_pair(), 98.5, 1.0).unwrap();
        sim.place_limit_order(create_pair(), 102.5, -2.0).unwrap();
        assert_locked_consistent(&sim);
        sim.set_time(create_time(60));
        assert_locked_consistent(&sim);
        sim.place_limit_order(create_pair(), 97.5, 0.5).unwrap();
        sim.set_time(create_time(120));
        sim.cancel_order(create_pair(), &a).unwrap();
        assert_locked_consistent(&sim);
        sim.set_time(create_time(180));
        assert_locked_consistent(&sim);
    }

    #[test]
    fn test_place_rejects_malformed() {
        let mut sim = create_sim(vec![]);
        assert!(matches!(
            sim.place_limit_order(create_pair(), f64::NAN, 1.0),
            Err(ExchangeError::InvalidOrder { .. })
        ));
        assert!(sim.place_limit_order(create_pair(), 100.0, 0.0).is_err());
        let unknown = Pair::new(Coin::Bgg, Coin::Usdt);
        assert!(matches!(
            sim.place_limit_order(unknown, 1.0, 1.0),
            Err(ExchangeError::Pair(_))
        ));
        assert!(sim.actions().is_empty());
    }

    #[test]
    fn test_price_is_rounded_and_ids_count() {
        let mut sim = create_sim(vec![]);
        assert_eq!(sim.place_limit_order(create_pair(), 90.126, 1.0).unwrap(), "0");
        assert_eq!(sim.place_limit_order(create_pair(), 90.0, 1.0).unwrap(), "1");
        assert!((sim.orders(create_pair())[0].price - 90.13).abs() < 1e-12);
    }

    #[test]
    fn test_reset_keeps_data() {
        let mut sim = create_sim(vec![create_print(30, 99.0, -1.0)]);
        sim.place_limit_order(create_pair(), 100.0, 1.0).unwrap();
        sim.set_time(create_time(60));
        sim.reset(Portfolio::with_balances([(Coin::Usdt, 1.0)]), create_time(0));
        assert!(sim.trades().is_empty());
        assert!(sim.actions().is_empty());
        assert_eq!(sim.now(), create_time(0));
        assert!(sim.get_order_book(create_pair()).is_valid());
        assert_eq!(sim.get_portfolio_by_coins(&[Coin::Usdt]).balance(Coin::Usdt), 1.0);
    }

    #[test]
    fn test_from_provider() {
        let provider = bean_data::InMemoryProvider::new()
            .with_order_books(create_pair(), create_series())
            .with_transactions(create_pair(), Transactions::new(vec![create_print(30, 99.0, 1.0)]));
        let sim = Simulator::from_provider(
            "sim",
            &provider,
            &[create_pair()],
            create_time(0),
            create_time(600),
            1,
            Portfolio::new(),
        )
        .unwrap();
        assert_eq!(sim.pairs(), vec![create_pair()]);
        assert_eq!(sim.get_order_book(create_pair()).bids().len(), 1);
    }
}
