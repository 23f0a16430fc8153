//! Position value and finite-difference Greeks.
//!
//! Every sensitivity is a symmetric bump of [`pv`], so futures, perpetuals
//! and options share one code path:
//!
//! | Greek   | bump                               | units            |
//! |---------|------------------------------------|------------------|
//! | delta   | spot and forward ±0.5%             | underlying coin  |
//! | gamma   | delta at spot and forward ±0.5%    | underlying coin  |
//! | vega    | vol ±0.005                         | quote coin       |
//! | theta   | `asof` + 1 day                     | quote coin       |

use bean_core::contract::Position;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::black76::{VOL_BUMP, forward_option_price};

/// Relative spot/forward bump for delta and gamma.
pub const SPOT_BUMP: f64 = 0.005;

/// Inverse futures pay `CONTRACT_SIZE` USD per contract.
pub const CONTRACT_SIZE: f64 = 10.0;

/// Bucket name for the spot part of [`bucket_delta`].
pub const CASH_BUCKET: &str = "CASH";

/// Market state a position is valued against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketInputs {
    /// Underlying spot price
    pub spot: f64,
    /// Forward price of the contract's expiry
    pub forward: f64,
    /// Lognormal volatility
    pub vol: f64,
}

impl MarketInputs {
    /// Creates market inputs.
    #[must_use]
    pub const fn new(spot: f64, forward: f64, vol: f64) -> Self {
        Self { spot, forward, vol }
    }

    /// Spot and forward both scaled by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            spot: self.spot * factor,
            forward: self.forward * factor,
            ..self
        }
    }

    /// Spot scaled by `factor`, forward unchanged.
    #[must_use]
    pub fn spot_scaled(self, factor: f64) -> Self {
        Self {
            spot: self.spot * factor,
            ..self
        }
    }

    /// Volatility shifted by `shift`.
    #[must_use]
    pub fn vol_shifted(self, shift: f64) -> Self {
        Self {
            vol: self.vol + shift,
            ..self
        }
    }
}

/// Present value in quote coin.
///
/// Options are marked net of the premium paid (`price` is in coin); futures,
/// perpetuals and indices as inverse contracts of [`CONTRACT_SIZE`] USD.
#[must_use]
pub fn pv(position: &Position, asof: DateTime<Utc>, market: &MarketInputs) -> f64 {
    let contract = &position.contract;
    if contract.is_option() {
        let days = contract.expiry_days(asof);
        let value = forward_option_price(
            days,
            contract.strike(),
            market.forward,
            market.vol,
            contract.call_put(),
        ) * market.spot
            / market.forward;
        value * position.quantity - position.price * market.spot * position.quantity
    } else {
        (1.0 / position.price - 1.0 / market.forward)
            * market.spot
            * position.quantity
            * CONTRACT_SIZE
    }
}

/// Value change for a one point vol move.
#[must_use]
pub fn vega(position: &Position, asof: DateTime<Utc>, market: &MarketInputs) -> f64 {
    pv(position, asof, &market.vol_shifted(VOL_BUMP)) - pv(position, asof, &market.vol_shifted(-VOL_BUMP))
}

/// Equivalent holding of the underlying coin.
#[must_use]
pub fn delta(position: &Position, asof: DateTime<Utc>, market: &MarketInputs) -> f64 {
    let fiat = (pv(position, asof, &market.scaled(1.0 + SPOT_BUMP))
        - pv(position, asof, &market.scaled(1.0 - SPOT_BUMP)))
        * 100.0;
    fiat / market.spot
}

/// Delta change across a 1% spot move.
#[must_use]
pub fn gamma(position: &Position, asof: DateTime<Utc>, market: &MarketInputs) -> f64 {
    delta(position, asof, &market.scaled(1.0 + SPOT_BUMP))
        - delta(position, asof, &market.scaled(1.0 - SPOT_BUMP))
}

/// One day of time decay.
#[must_use]
pub fn theta(position: &Position, asof: DateTime<Utc>, market: &MarketInputs) -> f64 {
    pv(position, asof + Duration::days(1), market) - pv(position, asof, market)
}

/// Delta split into spot exposure ([`CASH_BUCKET`]) and exposure to the
/// underlying future, keyed by the future's name.
#[must_use]
pub fn bucket_delta(
    position: &Position,
    asof: DateTime<Utc>,
    market: &MarketInputs,
) -> BTreeMap<String, f64> {
    let total = (pv(position, asof, &market.scaled(1.0 + SPOT_BUMP))
        - pv(position, asof, &market.scaled(1.0 - SPOT_BUMP)))
        * 100.0;
    let spot = (pv(position, asof, &market.spot_scaled(1.0 + SPOT_BUMP))
        - pv(position, asof, &market.spot_scaled(1.0 - SPOT_BUMP)))
        * 100.0;

    let mut buckets = BTreeMap::new();
    buckets.insert(CASH_BUCKET.to_string(), spot / market.spot);
    buckets.insert(
        position.contract.under_future().name(),
        (total - spot) / market.spot,
    );
    buckets
}
