//! Black-76 forward option pricing and the implied volatility solver.
//!
//! Premiums are in the quote coin. `forward_option_price` returns forward
//! value; multiplying by `spot / forward` discounts to spot value under the
//! zero-rate-on-coin convention.

use bean_core::contract::CallPut;
use statrs::function::erf::erfc;
use std::f64::consts::SQRT_2;

/// Days per year used for time to expiry.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Volatility bump used by finite-difference vega.
pub const VOL_BUMP: f64 = 0.005;

/// Newton iteration budget for [`implied_vol`].
pub const MAX_ITERATIONS: usize = 1000;

/// Convergence threshold on `|price error| / forward`.
pub const TOLERANCE: f64 = 1e-5;

/// Upper clamp on the volatility guess (500%).
pub const MAX_VOL: f64 = 5.0;

const VEGA_FLOOR: f64 = 1e-5;

/// Standard normal cumulative distribution.
#[must_use]
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Black-76 forward premium.
///
/// With zero days to expiry, or a non-positive volatility, the premium is the
/// intrinsic value. Returns `NaN` for [`CallPut::None`].
///
/// ```
/// use bean_core::contract::CallPut;
/// use bean_pricing::black76::forward_option_price;
///
/// let prm = forward_option_price(30, 100.0, 100.0, 0.5, CallPut::Call);
/// assert!(prm > 0.0 && prm < 100.0);
/// ```
#[must_use]
pub fn forward_option_price(
    expiry_days: i64,
    strike: f64,
    forward: f64,
    vol: f64,
    call_put: CallPut,
) -> f64 {
    let t = expiry_days as f64 / DAYS_PER_YEAR;
    let vol = if expiry_days == 0 { 0.0 } else { vol };
    let std_dev = vol * t.sqrt();

    if std_dev <= 0.0 {
        return match call_put {
            CallPut::Call => (forward - strike).max(0.0),
            CallPut::Put => (strike - forward).max(0.0),
            CallPut::None => f64::NAN,
        };
    }

    let d1 = ((forward / strike).ln() + std_dev * std_dev / 2.0) / std_dev;
    let d2 = d1 - std_dev;
    match call_put {
        CallPut::Call => forward * norm_cdf(d1) - strike * norm_cdf(d2),
        CallPut::Put => -forward * norm_cdf(-d1) + strike * norm_cdf(-d2),
        CallPut::None => f64::NAN,
    }
}

/// Spot value change of a call for a one vol point (±0.5%) move.
#[must_use]
pub fn option_vega(expiry_days: i64, strike: f64, spot: f64, forward: f64, vol: f64) -> f64 {
    spot / forward
        * (forward_option_price(expiry_days, strike, forward, vol + VOL_BUMP, CallPut::Call)
            - forward_option_price(expiry_days, strike, forward, vol - VOL_BUMP, CallPut::Call))
}

/// Volatility reproducing `premium` (spot value, quote coin).
///
/// Newton-Raphson from 100% vol. Returns `0.0` when the premium is at or
/// below the zero-vol value, and `NaN` when `expiry_days <= 0` or the solver
/// does not converge within [`MAX_ITERATIONS`].
#[must_use]
pub fn implied_vol(
    expiry_days: i64,
    strike: f64,
    spot: f64,
    forward: f64,
    premium: f64,
    call_put: CallPut,
) -> f64 {
    if expiry_days <= 0 {
        return f64::NAN;
    }
    let discount = spot / forward;
    let floor = discount * forward_option_price(expiry_days, strike, forward, 0.0, call_put);
    if premium <= floor {
        return 0.0;
    }

    let mut guess = 1.0;
    for _ in 0..MAX_ITERATIONS {
        let guess_premium =
            discount * forward_option_price(expiry_days, strike, forward, guess, call_put);
        let vega = option_vega(expiry_days, strike, spot, forward, guess).max(VEGA_FLOOR * spot);
        let error = guess_premium - premium;
        if (error / forward).abs() < TOLERANCE {
            return guess;
        }
        guess = (guess - error / (vega * 100.0)).clamp(0.0, MAX_VOL);
    }
    f64::NAN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_cdf() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-12);
        assert!((norm_cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((norm_cdf(-1.96) - 0.025).abs() < 1e-3);
    }

    #[test]
    fn test_atm_call_bounds() {
        let prm = forward_option_price(30, 100.0, 100.0, 0.5, CallPut::Call);
        assert!(prm > 0.0);
        assert!(prm < 100.0);
        // ATM approximation F * sigma * sqrt(t) / sqrt(2 pi)
        let approx = 100.0 * 0.5 * (30.0_f64 / 365.0).sqrt() * 0.398_942;
        assert!((prm - approx).abs() < 0.05);
    }

    #[test]
    fn test_put_call_parity() {
        for strike in [80.0, 100.0, 125.0] {
            let c = forward_option_price(90, strike, 100.0, 0.8, CallPut::Call);
            let p = forward_option_price(90, strike, 100.0, 0.8, CallPut::Put);
            assert!((c - p - (100.0 - strike)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_days_is_intrinsic() {
        assert!((forward_option_price(0, 90.0, 100.0, 0.5, CallPut::Call) - 10.0).abs() < 1e-12);
        assert_eq!(forward_option_price(0, 90.0, 100.0, 0.5, CallPut::Put), 0.0);
        assert_eq!(forward_option_price(0, 100.0, 100.0, 0.5, CallPut::Call), 0.0);
        assert!(forward_option_price(10, 100.0, 100.0, 0.5, CallPut::None).is_nan());
    }

    #[test]
    fn test_implied_vol_recovers_input() {
        for days in [7, 30, 180] {
            for vol in [0.05, 0.2, 0.5, 1.0, 2.0, 3.0] {
                for cp in [CallPut::Call, CallPut::Put] {
                    let prm = forward_option_price(days, 100.0, 100.0, vol, cp);
                    let iv = implied_vol(days, 100.0, 100.0, 100.0, prm, cp);
                    assert!((iv - vol).abs() < 1e-3, "days={days} vol={vol} iv={iv}");
                }
            }
        }
    }

    #[test]
    fn test_implied_vol_off_the_money() {
        for (strike, vol) in [(90.0, 0.6), (110.0, 0.6), (120.0, 1.2), (70.0, 1.5)] {
            let prm = forward_option_price(60, strike, 100.0, vol, CallPut::Call);
            let iv = implied_vol(60, strike, 100.0, 100.0, prm, CallPut::Call);
            assert!((iv - vol).abs() < 1e-3, "strike={strike} iv={iv}");
        }
    }

    #[test]
    fn test_implied_vol_floor_and_expired() {
        assert_eq!(implied_vol(30, 90.0, 100.0, 100.0, 10.0, CallPut::Call), 0.0);
        assert_eq!(implied_vol(30, 90.0, 100.0, 100.0, 5.0, CallPut::Call), 0.0);
        assert!(implied_vol(0, 100.0, 100.0, 100.0, 5.0, CallPut::Call).is_nan());
        assert!(implied_vol(-3, 100.0, 100.0, 100.0, 5.0, CallPut::Call).is_nan());
    }

    #[test]
    fn test_implied_vol_spot_discount() {
        let fwd = 102.0;
        let spot = 100.0;
        let prm = spot / fwd * forward_option_price(45, 100.0, fwd, 0.7, CallPut::Put);
        let iv = implied_vol(45, 100.0, spot, fwd, prm, CallPut::Put);
        assert!((iv - 0.7).abs() < 1e-3);
    }

    #[test]
    fn test_option_vega_positive() {
        let v = option_vega(30, 100.0, 100.0, 100.0, 0.5);
        assert!(v > 0.0);
        // one vol point on an ATM 30 day option
        assert!((v - 100.0 * 0.398_942 * (30.0_f64 / 365.0).sqrt() * 0.01).abs() < 0.01);
    }
}
