//! Pricing helpers on [`Contract`].

use bean_core::contract::Contract;
use chrono::{DateTime, Utc};

use crate::black76::{forward_option_price, implied_vol};
use crate::error::PricingError;

/// Option pricing for a parsed contract.
pub trait ContractPricing {
    /// Option value in quote coin, spot terms.
    fn opt_price(
        &self,
        asof: DateTime<Utc>,
        spot: f64,
        forward: f64,
        vol: f64,
    ) -> Result<f64, PricingError>;

    /// Implied vol from an option price quoted in the underlying coin, as
    /// venues quote options. `NaN` when the solver does not converge.
    fn implied_vol(
        &self,
        asof: DateTime<Utc>,
        spot: f64,
        forward: f64,
        coin_price: f64,
    ) -> Result<f64, PricingError>;
}

impl ContractPricing for Contract {
    fn opt_price(
        &self,
        asof: DateTime<Utc>,
        spot: f64,
        forward: f64,
        vol: f64,
    ) -> Result<f64, PricingError> {
        ensure_option(self)?;
        let days = self.expiry_days(asof);
        Ok(forward_option_price(days, self.strike(), forward, vol, self.call_put()) * spot / forward)
    }

    fn implied_vol(
        &self,
        asof: DateTime<Utc>,
        spot: f64,
        forward: f64,
        coin_price: f64,
    ) -> Result<f64, PricingError> {
        ensure_option(self)?;
        Ok(implied_vol(
            self.expiry_days(asof),
            self.strike(),
            spot,
            forward,
            coin_price * spot,
            self.call_put(),
        ))
    }
}

fn ensure_option(contract: &Contract) -> Result<(), PricingError> {
    if contract.is_option() {
        Ok(())
    } else {
        Err(PricingError::NotAnOption {
            contract: contract.name(),
        })
    }
}
