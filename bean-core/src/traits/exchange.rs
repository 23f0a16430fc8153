//! The order placement contract shared by live venues and the simulator.

use std::collections::BTreeMap;

use crate::data::{OrderBook, OrderStatus, Transactions};
use crate::error::ExchangeError;
use crate::ledger::Portfolio;
use crate::types::Pair;

/// A venue strategies can read from and trade on.
///
/// Amounts are signed: positive buys, negative sells. Implementations must
/// never expose data timestamped after their notion of "now".
pub trait Exchange {
    /// Venue name, used to route [`TradeAction`](super::TradeAction)s.
    fn name(&self) -> &str;

    /// Current order book; empty when nothing is known.
    fn get_order_book(&self, pair: Pair) -> OrderBook;

    /// Recent public trades, oldest first.
    fn get_transaction_history(&self, pair: Pair) -> Transactions;

    /// Account balances.
    fn get_portfolio(&self) -> Portfolio;

    /// Places a limit order and returns its id.
    fn place_limit_order(
        &mut self,
        pair: Pair,
        price: f64,
        amount: f64,
    ) -> Result<String, ExchangeError>;

    /// Cancels an order. Unknown or finished orders are ignored.
    fn cancel_order(&mut self, pair: Pair, order_id: &str) -> Result<(), ExchangeError>;

    /// Our resting orders on `pair`.
    fn get_my_orders(&self, pair: Pair) -> Vec<OrderStatus>;
}

/// Read-only views of the exchanges a strategy trades on, keyed by name.
pub type ExchangeViews<'a> = BTreeMap<String, &'a dyn Exchange>;
