//! Spot trading pairs and their exchange metadata.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Coin;
use crate::error::PairError;

/// A spot trading pair: `coin` priced in units of `base`.
///
/// Displays as the exchange ticker (`BTCUSDT`); parses and serialises as
/// `BTC/USDT` so that the two halves stay unambiguous.
///
/// # Examples
///
/// ```
/// use bean_core::types::{Coin, Pair};
///
/// let pair: Pair = "ETH/BTC".parse().unwrap();
/// assert_eq!(pair, Pair::new(Coin::Eth, Coin::Btc));
/// assert_eq!(pair.to_string(), "ETHBTC");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pair {
    /// Traded asset
    pub coin: Coin,
    /// Quote asset
    pub base: Coin,
}

impl Pair {
    /// Creates a new pair.
    #[must_use]
    pub const fn new(coin: Coin, base: Coin) -> Self {
        Self { coin, base }
    }

    /// Returns the `COIN/BASE` form.
    #[must_use]
    pub fn symbol(&self) -> String {
        format!("{}/{}", self.coin, self.base)
    }

    /// Smallest order size worth showing in a denoised book.
    ///
    /// Derived from venue lot sizes and minimum notionals; pairs without an
    /// entry use 1.0.
    #[must_use]
    pub fn minimum_trading_amount(&self) -> f64 {
        match (self.coin, self.base) {
            (Coin::Iotx, Coin::Eth) => 300.0,
            (Coin::Iotx, Coin::Btc) => 500.0,
            (Coin::Zrx, Coin::Eth) => 8.0,
            (Coin::Eth, Coin::Usdt) => 0.05,
            (Coin::Btc, Coin::Usdt) => 0.002,
            (Coin::Eth, Coin::Btc) => 0.016,
            (Coin::Trx, Coin::Btc) | (Coin::Mft, Coin::Eth | Coin::Btc) => 200.0,
            (Coin::Ont, Coin::Eth) => 6.0,
            (Coin::Ont, Coin::Usdt) => 8.0,
            (Coin::Etc, Coin::Eth) => 0.3,
            (Coin::Etc, Coin::Btc) | (Coin::Neo, Coin::Usdt | Coin::Btc) => 0.8,
            (Coin::Eos, Coin::Eth) => 2.0,
            (Coin::Eos, Coin::Usdt) => 3.0,
            (Coin::Eos, Coin::Btc) => 2.5,
            (Coin::Neo, Coin::Eth) => 0.6,
            (Coin::Mdt, Coin::Eth) => 1000.0,
            (Coin::Xmx, Coin::Eth) => 100.0,
            _ => 1.0,
        }
    }

    /// Number of decimal places the venue accepts for an order price.
    ///
    /// # Errors
    ///
    /// Returns [`PairError::UnknownPrecision`] for pairs with no entry.
    pub fn price_precision(&self) -> Result<u32, PairError> {
        let prec = match (self.coin, self.base) {
            (Coin::Eos, Coin::Ft) => 2,
            (Coin::Eth | Coin::Btc, Coin::Usdt) => 2,
            (Coin::Ont | Coin::Neo, Coin::Usdt) => 3,
            (Coin::Etc | Coin::Eos, Coin::Usdt) => 4,
            (Coin::Ft, Coin::Usdt) => 5,
            (Coin::Iotx, Coin::Usdt) => 6,
            (Coin::Eth, Coin::Btc)
            | (Coin::Ont | Coin::Neo | Coin::Etc | Coin::Eos, Coin::Eth)
            | (Coin::Neo | Coin::Etc, Coin::Btc) => 6,
            (Coin::Ont, Coin::Btc) | (Coin::Iotx, Coin::Eth) => 7,
            (Coin::Iotx | Coin::Trx | Coin::Mft | Coin::Ft | Coin::Eos, Coin::Btc)
            | (Coin::Zrx | Coin::Mft | Coin::Ft, Coin::Eth) => 8,
            _ => {
                return Err(PairError::UnknownPrecision {
                    pair: self.to_string(),
                });
            }
        };
        Ok(prec)
    }

    /// Rounds a price to the pair's order precision, half away from zero.
    ///
    /// # Errors
    ///
    /// Returns [`PairError::UnknownPrecision`] for unknown pairs and
    /// [`PairError::NonFinitePrice`] when `price` cannot be represented as a
    /// decimal.
    ///
    /// # Examples
    ///
    /// ```
    /// use bean_core::types::{Coin, Pair};
    ///
    /// let pair = Pair::new(Coin::Btc, Coin::Usdt);
    /// assert_eq!(pair.round_price(6543.215).unwrap(), 6543.22);
    /// ```
    pub fn round_price(&self, price: f64) -> Result<f64, PairError> {
        let rounded = self.round_price_decimal(price)?;
        rounded
            .to_f64()
            .ok_or_else(|| PairError::NonFinitePrice(price.to_string()))
    }

    /// Renders a price at the pair's order precision, as sent to a venue.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Pair::round_price`].
    pub fn format_order_price(&self, price: f64) -> Result<String, PairError> {
        let prec = self.price_precision()? as usize;
        let rounded = self.round_price_decimal(price)?;
        Ok(format!("{rounded:.prec$}"))
    }

    /// Smallest price increment, `10^-precision`.
    ///
    /// # Errors
    ///
    /// Returns [`PairError::UnknownPrecision`] for unknown pairs.
    pub fn minimum_tick(&self) -> Result<f64, PairError> {
        let prec = self.price_precision()?;
        Decimal::new(1, prec)
            .to_f64()
            .ok_or_else(|| PairError::UnknownPrecision {
                pair: self.to_string(),
            })
    }

    /// Formats a price for reports. Not for order placement.
    #[must_use]
    pub fn format_price(&self, price: f64) -> String {
        let prec = match (self.coin, self.base) {
            (Coin::Iotx, Coin::Eth) => return format!("{price:.3e}"),
            (Coin::Eth | Coin::Btc, Coin::Usdt) => 2,
            (Coin::Ont, Coin::Usdt) => 3,
            (Coin::Eth, Coin::Btc) | (Coin::Ont, Coin::Eth) => 6,
            _ => 8,
        };
        format!("{price:.prec$}")
    }

    fn round_price_decimal(&self, price: f64) -> Result<Decimal, PairError> {
        let prec = self.price_precision()?;
        let value = Decimal::from_f64(price)
            .ok_or_else(|| PairError::NonFinitePrice(price.to_string()))?;
        Ok(value.round_dp_with_strategy(prec, RoundingStrategy::MidpointAwayFromZero))
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.coin, self.base)
    }
}

impl FromStr for Pair {
    type Err = PairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (coin, base) = s
            .split_once(['/', '-', '_'])
            .ok_or_else(|| PairError::MalformedPair(s.to_string()))?;
        Ok(Self::new(coin.parse()?, base.parse()?))
    }
}

impl TryFrom<String> for Pair {
    type Error = PairError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pair> for String {
    fn from(pair: Pair) -> Self {
        pair.symbol()
    }
}

/// Distinct coins across `pairs`, base before coin, in first-seen order.
#[must_use]
pub fn all_coins(pairs: &[Pair]) -> Vec<Coin> {
    let mut coins = Vec::new();
    for pair in pairs {
        for coin in [pair.base, pair.coin] {
            if !coins.contains(&coin) {
                coins.push(coin);
            }
        }
    }
    coins
}

/// Orients two coins into the conventional pair, quoting in USDT, then BTC,
/// then ETH.
#[must_use]
pub fn right_pair(coin1: Coin, coin2: Coin) -> Option<Pair> {
    for quote in [Coin::Usdt, Coin::Btc, Coin::Eth] {
        if coin1 == quote {
            return Some(Pair::new(coin2, coin1));
        }
        if coin2 == quote {
            return Some(Pair::new(coin1, coin2));
        }
    }
    match (coin1, coin2) {
        (Coin::Iotx, Coin::Apot) | (Coin::Apot, Coin::Iotx) => {
            Some(Pair::new(Coin::Iotx, Coin::Apot))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn btc_usdt() -> Pair {
        Pair::new(Coin::Btc, Coin::Usdt)
    }

    #[test]
    fn test_pair_display_and_symbol() {
        let pair = btc_usdt();
        assert_eq!(pair.to_string(), "BTCUSDT");
        assert_eq!(pair.symbol(), "BTC/USDT");
    }

    #[test]
    fn test_pair_parse() {
        assert_eq!("btc/usdt".parse::<Pair>().unwrap(), btc_usdt());
        assert_eq!("ETH-BTC".parse::<Pair>().unwrap(), Pair::new(Coin::Eth, Coin::Btc));
        assert!(matches!(
            "BTCUSDT".parse::<Pair>(),
            Err(PairError::MalformedPair(_))
        ));
        assert!(matches!(
            "BTC/XYZ".parse::<Pair>(),
            Err(PairError::UnknownCoin(_))
        ));
    }

    #[test]
    fn test_pair_serde_roundtrip() {
        let pair = Pair::new(Coin::Ont, Coin::Eth);
        let json = serde_json::to_string(&pair).unwrap();
        assert_eq!(json, "\"ONT/ETH\"");
        let parsed: Pair = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, pair);
    }

    #[test]
    fn test_price_precision_table() {
        assert_eq!(btc_usdt().price_precision().unwrap(), 2);
        assert_eq!(Pair::new(Coin::Ont, Coin::Btc).price_precision().unwrap(), 7);
        assert_eq!(Pair::new(Coin::Iotx, Coin::Btc).price_precision().unwrap(), 8);
        assert_eq!(Pair::new(Coin::Eos, Coin::Ft).price_precision().unwrap(), 2);
        assert_eq!(Pair::new(Coin::Ft, Coin::Usdt).price_precision().unwrap(), 5);
    }

    #[test]
    fn test_price_precision_unknown_pair() {
        let err = Pair::new(Coin::Iota, Coin::Usdt).price_precision().unwrap_err();
        assert_eq!(
            err,
            PairError::UnknownPrecision {
                pair: "IOTAUSDT".to_string()
            }
        );
    }

    #[test]
    fn test_round_price() {
        let pair = btc_usdt();
        assert!((pair.round_price(6543.2149).unwrap() - 6543.21).abs() < 1e-9);
        assert!((pair.round_price(6543.215).unwrap() - 6543.22).abs() < 1e-9);

        let eth_btc = Pair::new(Coin::Eth, Coin::Btc);
        let rounded = eth_btc.round_price_decimal(0.034_567_89).unwrap();
        assert_eq!(rounded, dec!(0.034568));
    }

    #[test]
    fn test_round_price_rejects_nan() {
        assert!(matches!(
            btc_usdt().round_price(f64::NAN),
            Err(PairError::NonFinitePrice(_))
        ));
        assert!(btc_usdt().round_price(f64::INFINITY).is_err());
    }

    #[test]
    fn test_format_order_price_pads() {
        assert_eq!(btc_usdt().format_order_price(100.0).unwrap(), "100.00");
        let etc_usdt = Pair::new(Coin::Etc, Coin::Usdt);
        assert_eq!(etc_usdt.format_order_price(4.5).unwrap(), "4.5000");
    }

    #[test]
    fn test_minimum_tick() {
        assert!((btc_usdt().minimum_tick().unwrap() - 0.01).abs() < 1e-12);
        let iotx_btc = Pair::new(Coin::Iotx, Coin::Btc);
        assert!((iotx_btc.minimum_tick().unwrap() - 1e-8).abs() < 1e-18);
    }

    #[test]
    fn test_minimum_trading_amount_default() {
        assert!((Pair::new(Coin::Bnb, Coin::Btc).minimum_trading_amount() - 1.0).abs() < 1e-12);
        assert!((btc_usdt().minimum_trading_amount() - 0.002).abs() < 1e-12);
    }

    #[test]
    fn test_format_price() {
        assert_eq!(btc_usdt().format_price(1.5), "1.50");
        assert_eq!(Pair::new(Coin::Zrx, Coin::Eth).format_price(0.5), "0.50000000");
    }

    #[test]
    fn test_all_coins() {
        let coins = all_coins(&[btc_usdt(), Pair::new(Coin::Eth, Coin::Usdt)]);
        assert_eq!(coins, vec![Coin::Usdt, Coin::Btc, Coin::Eth]);
    }

    #[test]
    fn test_right_pair() {
        assert_eq!(right_pair(Coin::Usdt, Coin::Eth), Some(Pair::new(Coin::Eth, Coin::Usdt)));
        assert_eq!(right_pair(Coin::Eth, Coin::Btc), Some(Pair::new(Coin::Eth, Coin::Btc)));
        assert_eq!(right_pair(Coin::Apot, Coin::Iotx), Some(Pair::new(Coin::Iotx, Coin::Apot)));
        assert_eq!(right_pair(Coin::Neo, Coin::Ont), None);
    }
}
