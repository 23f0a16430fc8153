//! Portfolio risk under a spot shock.

use bean_core::contract::Contract;
use bean_core::ledger::Portfolio;
use bean_core::types::{Coin, Pair};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use crate::greeks::{self, MarketInputs};

/// Spot shocks of the risk ladder, as relative moves.
pub const RISK_LADDER_BUMPS: [f64; 10] = [-0.5, -0.25, -0.1, -0.05, 0.0, 0.05, 0.1, 0.25, 0.5, 1.0];

/// Market data needed to value a portfolio.
pub trait RiskMarket {
    /// Spot mid of `pair`.
    fn spot(&self, pair: Pair) -> Option<f64>;

    /// Spot, forward and vol for `contract`.
    fn contract_market(&self, contract: &Contract) -> Option<MarketInputs>;
}

/// A [`RiskMarket`] over fixed quotes.
#[derive(Debug, Clone, Default)]
pub struct StaticMarket {
    spots: HashMap<Pair, f64>,
    contracts: HashMap<String, MarketInputs>,
}

impl StaticMarket {
    /// An empty market.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the spot mid of `pair`.
    #[must_use]
    pub fn with_spot(mut self, pair: Pair, spot: f64) -> Self {
        self.spots.insert(pair, spot);
        self
    }

    /// Sets the inputs for `contract`.
    #[must_use]
    pub fn with_contract(mut self, contract: &Contract, inputs: MarketInputs) -> Self {
        self.contracts.insert(contract.name(), inputs);
        self
    }
}

impl RiskMarket for StaticMarket {
    fn spot(&self, pair: Pair) -> Option<f64> {
        self.spots.get(&pair).copied()
    }

    fn contract_market(&self, contract: &Contract) -> Option<MarketInputs> {
        self.contracts.get(&contract.name()).copied()
    }
}

/// Aggregated risk of one portfolio.
///
/// Coin balances count as delta against USDT. Contract sensitivities are
/// keyed by the contract's underlying pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    /// Shocked spot per underlying
    pub spot: BTreeMap<Pair, f64>,
    /// Value per coin
    pub pv: BTreeMap<Coin, f64>,
    /// Total value in USD
    pub pv_usd: f64,
    /// Delta per pair, underlying coin
    pub delta: BTreeMap<Pair, f64>,
    /// Gamma per pair, underlying coin
    pub gamma: BTreeMap<Pair, f64>,
    /// Vega per pair, quote coin
    pub vega: BTreeMap<Pair, f64>,
    /// One-day theta, quote coin
    pub theta: f64,
}

impl Risk {
    /// Human-readable report focused on `pair`.
    #[must_use]
    pub fn summary(&self, pair: Pair) -> String {
        let get = |m: &BTreeMap<Pair, f64>| m.get(&pair).copied().unwrap_or_default();
        format!(
            "Spot:       {:7.1}\n\
             PV ({})    {:6.3}\n\
             PV (USD)    {:6.1}\n\
             DELTA ({}) {:6.3}\n\
             GAMMA ({}) {:6.3}\n\
             VEGA (USD)  {:6.1}\n\
             THETA (USD) {:6.1}\n",
            get(&self.spot),
            pair.coin,
            self.pv.get(&pair.coin).copied().unwrap_or_default(),
            self.pv_usd,
            pair.coin,
            get(&self.delta),
            pair.coin,
            get(&self.gamma),
            get(&self.vega),
            self.theta,
        )
    }
}

/// Values `portfolio` with every spot and forward shocked by `spot_bump`.
///
/// A coin without a USDT spot adds `NaN` to [`Risk::pv_usd`]. A contract
/// without market inputs is skipped.
pub fn portfolio_risk(
    portfolio: &Portfolio,
    market: &dyn RiskMarket,
    asof: DateTime<Utc>,
    spot_bump: f64,
) -> Risk {
    let mut risk = Risk::default();
    let shock = 1.0 + spot_bump;

    for (&coin, &balance) in portfolio.balances() {
        let pair = Pair::new(coin, Coin::Usdt);
        *risk.pv.entry(coin).or_default() += balance;
        *risk.delta.entry(pair).or_default() += balance;
        if coin == Coin::Usdt {
            risk.pv_usd += balance;
            continue;
        }
        match market.spot(pair) {
            Some(spot) => risk.pv_usd += balance * spot * shock,
            None => {
                warn!(pair = %pair, "No spot for balance valuation");
                risk.pv_usd = f64::NAN;
            }
        }
    }

    for position in portfolio.contracts() {
        let Some(inputs) = market.contract_market(&position.contract) else {
            warn!(contract = %position.contract, "No market for contract, skipped");
            continue;
        };
        let inputs = inputs.scaled(shock);
        let pair = position.contract.underlying();
        let value = greeks::pv(position, asof, &inputs);

        risk.spot.insert(pair, inputs.spot);
        *risk.pv.entry(pair.coin).or_default() += value / inputs.spot;
        risk.pv_usd += value;
        *risk.delta.entry(pair).or_default() += greeks::delta(position, asof, &inputs);
        *risk.gamma.entry(pair).or_default() += greeks::gamma(position, asof, &inputs);
        *risk.vega.entry(pair).or_default() += greeks::vega(position, asof, &inputs);
        risk.theta += greeks::theta(position, asof, &inputs);
    }

    risk
}

/// [`portfolio_risk`] at each of [`RISK_LADDER_BUMPS`], in bump order.
pub fn risk_ladder(
    portfolio: &Portfolio,
    market: &dyn RiskMarket,
    asof: DateTime<Utc>,
) -> Vec<(f64, Risk)> {
    RISK_LADDER_BUMPS
        .iter()
        .map(|&bump| (bump, portfolio_risk(portfolio, market, asof, bump)))
        .collect()
}

/// Ladder table of spot, USD value, change against the unshocked row, delta
/// and vega for `pair`.
#[must_use]
pub fn risk_ladder_summary(ladder: &[(f64, Risk)], pair: Pair) -> String {
    let base = ladder
        .iter()
        .find(|(bump, _)| *bump == 0.0)
        .map_or(f64::NAN, |(_, r)| r.pv_usd);
    let mut out = String::from("SPOT   PV     VAR DELTA VEGA\n");
    for (_, r) in ladder {
        let get = |m: &BTreeMap<Pair, f64>| m.get(&pair).copied().unwrap_or_default();
        out.push_str(&format!(
            "{:6.1} {:6.0} {:<3.0} {:5.2} {:4.1}\n",
            get(&r.spot),
            r.pv_usd,
            r.pv_usd - base,
            get(&r.delta),
            get(&r.vega)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn create_asof() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 2, 26, 8, 0, 0).unwrap()
    }

    fn create_option() -> Contract {
        "BTC-27MAR20-9000-C".parse().unwrap()
    }

    fn create_market() -> StaticMarket {
        StaticMarket::new()
            .with_spot(Pair::new(Coin::Btc, Coin::Usdt), 9000.0)
            .with_contract(&create_option(), MarketInputs::new(9000.0, 9050.0, 0.6))
    }

    fn create_portfolio() -> Portfolio {
        let mut p = Portfolio::with_balances([(Coin::Btc, 1.0), (Coin::Usdt, 500.0)]);
        p.add_contract(Arc::new(create_option()), 2.0, 0.05);
        p
    }

    #[test]
    fn test_balances_only() {
        let p = Portfolio::with_balances([(Coin::Btc, 2.0), (Coin::Usdt, 100.0)]);
        let r = portfolio_risk(&p, &create_market(), create_asof(), 0.1);
        assert!((r.pv_usd - (2.0 * 9000.0 * 1.1 + 100.0)).abs() < 1e-9);
        assert!((r.delta[&Pair::new(Coin::Btc, Coin::Usdt)] - 2.0).abs() < 1e-12);
        assert!((r.pv[&Coin::Usdt] - 100.0).abs() < 1e-12);
        assert_eq!(r.theta, 0.0);
    }

    #[test]
    fn test_missing_spot_is_nan() {
        let p = Portfolio::with_balances([(Coin::Eth, 1.0)]);
        let r = portfolio_risk(&p, &create_market(), create_asof(), 0.0);
        assert!(r.pv_usd.is_nan());
    }

    #[test]
    fn test_contract_risk() {
        let r = portfolio_risk(&create_portfolio(), &create_market(), create_asof(), 0.0);
        let underlying = create_option().underlying();
        assert!((r.spot[&underlying] - 9000.0).abs() < 1e-9);
        assert!(r.vega[&underlying] > 0.0);
        assert!(r.gamma[&underlying] > 0.0);
        assert!(r.theta < 0.0);
        assert!(r.summary(underlying).contains("THETA (USD)"));
    }

    #[test]
    fn test_ladder_order_and_monotone_value() {
        let p = create_portfolio();
        let ladder = risk_ladder(&p, &create_market(), create_asof());
        assert_eq!(ladder.len(), RISK_LADDER_BUMPS.len());
        assert_eq!(ladder[4].0, 0.0);
        // long coin and long calls gain with spot
        for w in ladder.windows(2) {
            assert!(w[1].1.pv_usd > w[0].1.pv_usd);
        }
        let table = risk_ladder_summary(&ladder, create_option().underlying());
        assert_eq!(table.lines().count(), 11);
        assert!(table.ends_with('\n'));
    }

    #[test]
    fn test_summary_layout() {
        let p = Portfolio::with_balances([(Coin::Btc, 2.0)]);
        let pair = Pair::new(Coin::Btc, Coin::Usdt);
        let summary = portfolio_risk(&p, &create_market(), create_asof(), 0.0).summary(pair);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), 7);
        // no contract on the pair, so no spot is recorded for it
        assert_eq!(lines[0], "Spot:           0.0");
        assert_eq!(lines[1], "PV (BTC)     2.000");
        assert_eq!(lines[2], "PV (USD)    18000.0");
        assert_eq!(lines[3], "DELTA (BTC)  2.000");
        assert!(lines[6].starts_with("THETA (USD)"));
    }
}
