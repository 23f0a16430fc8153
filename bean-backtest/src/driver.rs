//! Virtual-time backtest loop.
//!
//! One [`Simulator`] is built per exchange the strategy names, each loaded
//! with every pair the strategy trades. Time then advances from `start` in
//! fixed ticks; at each tick every simulator catches up, the strategy
//! decides, and its actions are applied in the order returned.

use bean_core::data::Transactions;
use bean_core::ledger::Portfolio;
use bean_core::traits::{Exchange, ExchangeViews, HistoricalDataProvider, Strategy, TradeAction};
use bean_core::types::{Coin, Pair};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::BacktestError;
use crate::evaluate::{
    PerformanceSeries, ReferenceRateBook, Snapshots, evaluate_snapshots, rates_from_transactions,
};
use crate::simulator::Simulator;

/// An action that reached an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRef {
    /// Exchange name
    pub exchange: String,
    /// Pair
    pub pair: Pair,
    /// Order id
    pub order_id: String,
    /// Simulated time of the action
    pub time: DateTime<Utc>,
}

/// Output of one strategy run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Strategy name
    pub strategy: String,
    /// Fills of every simulator, in time order
    pub transactions: Transactions,
    /// Run start
    pub start: DateTime<Utc>,
    /// Run end
    pub end: DateTime<Utc>,
    /// Traded pairs
    pub pairs: Vec<Pair>,
}

impl BacktestResult {
    /// Values the fills in `mtm_base`, starting from an empty portfolio.
    #[must_use]
    pub fn evaluate(&self, mtm_base: Coin, rates: &ReferenceRateBook) -> PerformanceSeries {
        let snapshots = Snapshots::generate(&self.transactions, &Portfolio::new());
        evaluate_snapshots(&snapshots, mtm_base, rates)
    }

    /// Reference rates into `mtm_base` for every coin of the traded pairs,
    /// taken from the public tape over the run window.
    pub fn reference_rates(
        &self,
        provider: &dyn HistoricalDataProvider,
        mtm_base: Coin,
    ) -> Result<ReferenceRateBook, BacktestError> {
        let mut book = ReferenceRateBook::new();
        for pair in &self.pairs {
            for coin in [pair.coin, pair.base] {
                let rate_pair = Pair::new(coin, mtm_base);
                if coin == mtm_base || book.contains_key(&rate_pair) {
                    continue;
                }
                let tape = provider.transactions(rate_pair, self.start, self.end)?;
                if tape.is_empty() {
                    warn!(pair = %rate_pair, "No reference rates for pair");
                }
                book.insert(rate_pair, rates_from_transactions(&tape));
            }
        }
        Ok(book)
    }
}

/// Runs strategies against simulators fed from a historical provider.
pub struct Backtest<'a> {
    provider: &'a dyn HistoricalDataProvider,
    depth: usize,
}

impl<'a> Backtest<'a> {
    /// Creates a driver loading books cut to `depth` levels.
    #[must_use]
    pub const fn new(provider: &'a dyn HistoricalDataProvider, depth: usize) -> Self {
        Self { provider, depth }
    }

    /// Runs `strategy` over `[start, end)` with `portfolio` on every exchange.
    pub fn simulate(
        &self,
        strategy: &mut dyn Strategy,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        portfolio: &Portfolio,
    ) -> Result<BacktestResult, BacktestError> {
        let mut simulators = self.build_simulators(
            &strategy.exchange_names(),
            &strategy.pairs(),
            start,
            end,
            portfolio,
        )?;
        run(strategy, &mut simulators, start, end)
    }

    /// Runs each strategy in turn on one set of simulators.
    ///
    /// Data is loaded once; portfolio, orders and fills are reset before
    /// every run.
    pub fn simulate_many(
        &self,
        strategies: &mut [Box<dyn Strategy>],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        portfolio: &Portfolio,
    ) -> Result<Vec<BacktestResult>, BacktestError> {
        let mut names: Vec<String> = Vec::new();
        let mut pairs: Vec<Pair> = Vec::new();
        for strategy in strategies.iter() {
            for name in strategy.exchange_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            for pair in strategy.pairs() {
                if !pairs.contains(&pair) {
                    pairs.push(pair);
                }
            }
        }

        let mut simulators = self.build_simulators(&names, &pairs, start, end, portfolio)?;
        let mut results = Vec::with_capacity(strategies.len());
        for strategy in strategies.iter_mut() {
            for sim in &mut simulators {
                sim.reset(portfolio.clone(), start);
            }
            results.push(run(strategy.as_mut(), &mut simulators, start, end)?);
        }
        Ok(results)
    }

    fn build_simulators(
        &self,
        names: &[String],
        pairs: &[Pair],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        portfolio: &Portfolio,
    ) -> Result<Vec<Simulator>, BacktestError> {
        names
            .iter()
            .map(|name| {
                Simulator::from_provider(
                    name.as_str(),
                    self.provider,
                    pairs,
                    start,
                    end,
                    self.depth,
                    portfolio.clone(),
                )
            })
            .collect()
    }
}

pub(crate) fn run(
    strategy: &mut dyn Strategy,
    simulators: &mut [Simulator],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<BacktestResult, BacktestError> {
    let tick = strategy.tick();
    if tick <= chrono::Duration::zero() {
        return Err(BacktestError::InvalidConfig(format!(
            "tick must be positive, got {tick}"
        )));
    }
    if end < start {
        return Err(BacktestError::InvalidConfig(format!(
            "end {end} is before start {start}"
        )));
    }

    info!(
        strategy = strategy.name(),
        params = %strategy.format_params(),
        start = %start,
        end = %end,
        "Backtest started"
    );

    let mut ticks = 0_u64;
    let mut t = start;
    while t < end {
        for sim in simulators.iter_mut() {
            sim.set_time(t);
        }
        let actions = {
            let views: ExchangeViews<'_> = simulators
                .iter()
                .map(|s| (s.name().to_string(), s as &dyn Exchange))
                .collect();
            strategy.grind(&views)
        };
        perform_actions(simulators, &actions, t);
        ticks += 1;
        t += tick;
    }

    let mut transactions = Transactions::default();
    for sim in simulators.iter() {
        transactions.extend(sim.trades().clone());
    }
    transactions.sort();

    info!(
        strategy = strategy.name(),
        ticks,
        fills = transactions.len(),
        "Backtest finished"
    );

    Ok(BacktestResult {
        strategy: strategy.name().to_string(),
        transactions,
        start,
        end,
        pairs: strategy.pairs(),
    })
}

/// Applies `actions` in order against the exchange each one names.
///
/// Actions for unknown exchanges and rejected orders are logged and
/// skipped. Returns the placed and the cancelled orders.
pub fn perform_actions<E: Exchange>(
    exchanges: &mut [E],
    actions: &[TradeAction],
    time: DateTime<Utc>,
) -> (Vec<OrderRef>, Vec<OrderRef>) {
    let mut index: HashMap<String, usize> = HashMap::new();
    for (i, exchange) in exchanges.iter().enumerate() {
        index.insert(exchange.name().to_string(), i);
    }

    let mut placed = Vec::new();
    let mut cancelled = Vec::new();
    for action in actions {
        let Some(&i) = index.get(action.exchange()) else {
            warn!(exchange = action.exchange(), action = %action, "Unknown exchange, action skipped");
            continue;
        };
        let exchange = &mut exchanges[i];
        match action {
            TradeAction::PlaceLimitOrder {
                exchange: name,
                pair,
                price,
                amount,
            } => match exchange.place_limit_order(*pair, *price, *amount) {
                Ok(order_id) => {
                    debug!(exchange = %name, pair = %pair, order_id = %order_id, "Order placed");
                    placed.push(OrderRef {
                        exchange: name.clone(),
                        pair: *pair,
                        order_id,
                        time,
                    });
                }
                Err(e) => warn!(exchange = %name, action = %action, error = %e, "Order rejected"),
            },
            TradeAction::CancelOpenOrder {
                exchange: name,
                pair,
                order_id,
            } => match exchange.cancel_order(*pair, order_id) {
                Ok(()) => cancelled.push(OrderRef {
                    exchange: name.clone(),
                    pair: *pair,
                    order_id: order_id.clone(),
                    time,
                }),
                Err(e) => warn!(exchange = %name, action = %action, error = %e, "Cancel failed"),
            },
        }
    }
    (placed, cancelled)
}
