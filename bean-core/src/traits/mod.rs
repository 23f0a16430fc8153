//! Seams between strategies, exchanges and data sources.
//!
//! - [`Exchange`] - Implemented by live venue clients and the simulator
//! - [`Strategy`] - Emits [`TradeAction`]s each tick
//! - [`HistoricalDataProvider`] - Recorded books and trades for replay

mod exchange;
mod provider;
mod strategy;

pub use exchange::{Exchange, ExchangeViews};
pub use provider::HistoricalDataProvider;
pub use strategy::{Strategy, TimedAction, TradeAction};
