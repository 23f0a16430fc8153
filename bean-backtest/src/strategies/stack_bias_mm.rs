//! `StackBiasMm` market maker.
//!
//! Reads the book twice per tick: once for the quote size and once for a
//! much larger size. The large-size two-way, weighted by how much each side
//! actually offers, pulls the quoted mid towards where size is trading. The
//! held position pushes it the other way so that inventory is worked off.
//! The quoted width tracks a moving average of the small-size spread.

use std::collections::VecDeque;

use bean_core::config::{BacktestConfig, StrategyConfig};
use bean_core::data::OrderBook;
use bean_core::traits::{ExchangeViews, Strategy, TradeAction};
use bean_core::types::Pair;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::first_pair;
use crate::error::BacktestError;

/// Samples in the moving average spread.
pub const SPREAD_WINDOW: usize = 10;

/// `StackBiasMm` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackBiasMmParams {
    /// Exchange to quote on
    pub exchange: String,
    /// Quoted pair
    pub pair: Pair,
    /// Seconds between decisions
    pub tick_secs: i64,
    /// Size used to read the deep two-way
    pub large_amount: f64,
    /// 0 ignores the deep two-way, 1 moves the mid all the way to it
    pub large_bias_factor: f64,
    /// Quote size in coin units
    pub trading_amount: f64,
    /// Position at which the position bias reaches full strength
    pub max_position: f64,
    /// At `max_position` the mid moves this many average spreads
    pub position_bias_factor: f64,
    /// Quoted width in average spreads
    pub widener: f64,
    /// No position bias while the deep two-way is at least this wide
    pub wide_spread: f64,
    /// Discount per level for the sell/buy pressure ratio
    pub sb_alpha: f64,
    /// Average spreads the mid moves at full sell/buy pressure; 0 disables
    pub sb_skew: f64,
}

impl StackBiasMmParams {
    /// Parameters with the default deep size, width and bias settings.
    #[must_use]
    pub fn new(exchange: impl Into<String>, pair: Pair) -> Self {
        Self {
            exchange: exchange.into(),
            pair,
            tick_secs: 60,
            large_amount: 10.0,
            large_bias_factor: 0.5,
            trading_amount: 1.0,
            max_position: 10.0,
            position_bias_factor: 0.5,
            widener: 1.5,
            wide_spread: 10.0,
            sb_alpha: 0.5,
            sb_skew: 0.0,
        }
    }

    /// Checks sizes are positive and factors are in range.
    pub fn validate(&self) -> Result<(), BacktestError> {
        let invalid = |msg: String| Err(BacktestError::InvalidConfig(msg));
        if self.exchange.is_empty() {
            return invalid("exchange cannot be empty".to_string());
        }
        if self.tick_secs <= 0 {
            return invalid("tick_secs must be positive".to_string());
        }
        for (field, value) in [
            ("large_amount", self.large_amount),
            ("trading_amount", self.trading_amount),
            ("max_position", self.max_position),
            ("widener", self.widener),
            ("wide_spread", self.wide_spread),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return invalid(format!("{field} must be positive, got {value}"));
            }
        }
        if self.trading_amount > self.large_amount {
            return invalid("trading_amount cannot exceed large_amount".to_string());
        }
        if !(self.sb_alpha > 0.0 && self.sb_alpha <= 1.0) {
            return invalid(format!("sb_alpha must be in (0, 1], got {}", self.sb_alpha));
        }
        if !self.sb_skew.is_finite() {
            return invalid("sb_skew must be finite".to_string());
        }
        Ok(())
    }
}

/// Quotes a small size around a mid biased by the deep book and by position.
#[derive(Debug, Clone)]
pub struct StackBiasMm {
    params: StackBiasMmParams,
    spreads: VecDeque<f64>,
}

impl StackBiasMm {
    /// Creates the strategy after validating `params`.
    pub fn new(params: StackBiasMmParams) -> Result<Self, BacktestError> {
        params.validate()?;
        Ok(Self {
            params,
            spreads: VecDeque::with_capacity(SPREAD_WINDOW),
        })
    }

    /// Builds the strategy from a backtest configuration, quoting its first pair.
    pub fn from_config(config: &BacktestConfig) -> Result<Self, BacktestError> {
        let StrategyConfig::StackBiasMm {
            trading_amount,
            max_position,
            large_bias_factor,
            position_bias_factor,
        } = config.strategy
        else {
            return Err(BacktestError::InvalidConfig(
                "strategy type is not stack_bias_mm".to_string(),
            ));
        };
        let defaults = StackBiasMmParams::new(config.exchange.clone(), first_pair(config)?);
        Self::new(StackBiasMmParams {
            tick_secs: config.tick().num_seconds(),
            trading_amount,
            max_position,
            large_bias_factor,
            position_bias_factor,
            large_amount: defaults.large_amount.max(trading_amount),
            ..defaults
        })
    }

    /// Current parameters.
    #[must_use]
    pub const fn params(&self) -> &StackBiasMmParams {
        &self.params
    }

    /// Moving average of the quote-size spread, `NaN` before the first sample.
    #[must_use]
    pub fn average_spread(&self) -> f64 {
        if self.spreads.is_empty() {
            return f64::NAN;
        }
        self.spreads.iter().sum::<f64>() / self.spreads.len() as f64
    }

    fn record_spread(&mut self, spread: f64) {
        if self.spreads.len() == SPREAD_WINDOW {
            self.spreads.pop_front();
        }
        self.spreads.push_back(spread);
    }

    /// Bid and ask to quote given the book and the current position.
    fn quotes(&mut self, book: &OrderBook, position: f64) -> (f64, f64) {
        let p = &self.params;
        let large = book.price_in(p.large_amount);
        let trading = book.price_in(p.trading_amount);
        let (trading_bid, trading_ask) = (trading.bid.price, trading.ask.price);
        let trading_mid = (trading_bid + trading_ask) / 2.0;

        // each deep price is weighted by the depth found on the other side
        let large_mid = (large.bid.price * large.ask.available + large.ask.price * large.bid.available)
            / (large.bid.available + large.ask.available);
        let large_bias = (large_mid - trading_mid) * p.large_bias_factor;

        self.record_spread(trading_ask - trading_bid);
        let average_spread = self.average_spread();
        let p = &self.params;

        let position_bias = if large.ask.price - large.bid.price < p.wide_spread {
            -position / p.max_position * average_spread * p.position_bias_factor
        } else {
            0.0
        };

        let sb_ratio = p
            .pair
            .minimum_tick()
            .map_or(f64::NAN, |tick| book.sb_ratio(p.sb_alpha, tick));
        let pressure = sb_ratio.ln().clamp(-1.0, 1.0);
        let sb_bias = if p.sb_skew != 0.0 && pressure.is_finite() {
            -pressure * average_spread * p.sb_skew
        } else {
            0.0
        };

        let our_mid = (trading_mid + large_bias + position_bias + sb_bias)
            .max(trading_bid)
            .min(trading_ask);
        let half_width = average_spread / 2.0 * p.widener;

        debug!(
            pair = %p.pair,
            position,
            large_bias,
            position_bias,
            sb_ratio,
            sb_bias,
            mid = our_mid,
            "Stack bias quote"
        );
        (our_mid - half_width, our_mid + half_width)
    }
}

impl Strategy for StackBiasMm {
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
        let name = self.params.exchange.clone();
        let pair = self.params.pair;
        let Some(exchange) = exchanges.get(&name) else {
            warn!(exchange = %name, "Exchange not available to strategy");
            return Vec::new();
        };

        let mut actions: Vec<TradeAction> = exchange
            .get_my_orders(pair)
            .into_iter()
            .map(|o| TradeAction::cancel(name.as_str(), pair, o.order_id))
            .collect();

        let position = exchange.get_portfolio().balance(pair.coin);
        let book = exchange.get_order_book(pair);
        if !book.is_valid() {
            debug!(exchange = %name, pair = %pair, "Order book not valid, pulling quotes");
            return actions;
        }

        let (bid, ask) = self.quotes(&book, position);
        let amount = self.params.trading_amount;
        actions.push(TradeAction::place(name.as_str(), pair, ask, -amount));
        actions.push(TradeAction::place(name.as_str(), pair, bid, amount));
        actions
    }

    fn name(&self) -> &str {
        "stack_bias_mm"
    }

    fn format_params(&self) -> String {
        let p = &self.params;
        format!(
            "{} {} amount={} large={} max_position={} large_bias={} position_bias={} tick={}s",
            p.exchange,
            p.pair,
            p.trading_amount,
            p.large_amount,
            p.max_position,
            p.large_bias_factor,
            p.position_bias_factor,
            p.tick_secs
        )
    }
}
