//! Market data and order models.
//!
//! # Types
//!
//! - [`Order`] / [`OrderBook`] - Price levels and the bid/ask ladder
//! - [`OrderBookSnapshot`] / [`OrderBookSeries`] - Timed books with last-known-value lookup
//! - [`Transaction`] / [`Transactions`] - Executed trades and the tape
//! - [`OrderStatus`] - Exchange view of one of our orders
//! - [`TradeLog`] - One of our own fills

mod order;
mod orderbook;
mod series;
mod tradelog;
mod transaction;

pub use order::{Maker, OrderState, OrderStatus, Side};
pub use orderbook::{
    CumPctOrderBook, DepthPrice, FLOOR_BID_AMOUNT, Order, OrderBook, PriceIn, SB_RATIO_DEPTH,
};
pub use series::{OrderBookSeries, OrderBookSnapshot};
pub use tradelog::{
    TradeLog, TradeLogSummary, TradeLogs, trade_log_pairs, trade_logs_to_transactions,
};
pub use transaction::{Transaction, Transactions};
