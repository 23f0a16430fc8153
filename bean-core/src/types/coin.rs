//! Coin symbols.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PairError;

/// A tradeable asset.
///
/// The set is closed: a symbol outside it fails to parse with
/// [`PairError::UnknownCoin`] rather than being carried around as free text.
///
/// # Examples
///
/// ```
/// use bean_core::types::Coin;
///
/// let coin: Coin = "btc".parse().unwrap();
/// assert_eq!(coin, Coin::Btc);
/// assert_eq!(coin.to_string(), "BTC");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Coin {
    /// Bitcoin
    Btc,
    /// Ether
    Eth,
    /// Tether
    Usdt,
    /// US dollar, the quote of inverse derivative contracts
    Usd,
    /// USD Coin
    Usdc,
    /// Paxos dollar
    Pax,
    /// TrueUSD
    Tusd,
    /// IoTeX
    Iotx,
    /// 0x
    Zrx,
    /// Ontology
    Ont,
    /// Ethereum Classic
    Etc,
    /// EOS
    Eos,
    /// NEO
    Neo,
    /// IOTA
    Iota,
    /// Bgogo token
    Bgg,
    /// FCoin token
    Ft,
    /// Huobi token
    Ht,
    /// XMax
    Xmx,
    /// NKN
    Nkn,
    /// Tron
    Trx,
    /// Mainframe
    Mft,
    /// Mithril
    Mith,
    /// Measurable Data Token
    Mdt,
    /// Game.com
    Gtc,
    /// Binance coin
    Bnb,
    /// A-POT
    Apot,
}

impl Coin {
    /// Every known coin, in declaration order.
    pub const ALL: [Self; 26] = [
        Self::Btc,
        Self::Eth,
        Self::Usdt,
        Self::Usd,
        Self::Usdc,
        Self::Pax,
        Self::Tusd,
        Self::Iotx,
        Self::Zrx,
        Self::Ont,
        Self::Etc,
        Self::Eos,
        Self::Neo,
        Self::Iota,
        Self::Bgg,
        Self::Ft,
        Self::Ht,
        Self::Xmx,
        Self::Nkn,
        Self::Trx,
        Self::Mft,
        Self::Mith,
        Self::Mdt,
        Self::Gtc,
        Self::Bnb,
        Self::Apot,
    ];

    /// Returns the upper-case ticker.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Btc => "BTC",
            Self::Eth => "ETH",
            Self::Usdt => "USDT",
            Self::Usd => "USD",
            Self::Usdc => "USDC",
            Self::Pax => "PAX",
            Self::Tusd => "TUSD",
            Self::Iotx => "IOTX",
            Self::Zrx => "ZRX",
            Self::Ont => "ONT",
            Self::Etc => "ETC",
            Self::Eos => "EOS",
            Self::Neo => "NEO",
            Self::Iota => "IOTA",
            Self::Bgg => "BGG",
            Self::Ft => "FT",
            Self::Ht => "HT",
            Self::Xmx => "XMX",
            Self::Nkn => "NKN",
            Self::Trx => "TRX",
            Self::Mft => "MFT",
            Self::Mith => "MITH",
            Self::Mdt => "MDT",
            Self::Gtc => "GTC",
            Self::Bnb => "BNB",
            Self::Apot => "APOT",
        }
    }

    /// Returns true for fiat and fiat-pegged coins.
    #[must_use]
    pub const fn is_stable(&self) -> bool {
        matches!(
            self,
            Self::Usdt | Self::Usd | Self::Usdc | Self::Pax | Self::Tusd
        )
    }

    /// Decimal places an order amount of this coin may carry.
    ///
    /// # Errors
    ///
    /// Returns [`PairError::UnknownAmountPrecision`] for coins without a
    /// known lot size.
    pub fn amount_precision(&self) -> Result<u32, PairError> {
        match self {
            Self::Iotx | Self::Zrx | Self::Trx | Self::Mft | Self::Mdt => Ok(0),
            Self::Ont | Self::Ft => Ok(2),
            Self::Eth => Ok(3),
            Self::Btc | Self::Etc | Self::Eos | Self::Neo => Ok(6),
            _ => Err(PairError::UnknownAmountPrecision {
                coin: self.to_string(),
            }),
        }
    }

    /// Truncates `amount` to the coin's lot size.
    ///
    /// Rounds towards zero so a sell never exceeds the amount it was
    /// sized from.
    ///
    /// # Errors
    ///
    /// Returns [`PairError::UnknownAmountPrecision`] for unknown coins and
    /// [`PairError::NonFiniteAmount`] when `amount` is NaN or infinite.
    pub fn round_amount(&self, amount: f64) -> Result<f64, PairError> {
        self.round_amount_decimal(amount)?
            .to_f64()
            .ok_or_else(|| PairError::NonFiniteAmount(amount.to_string()))
    }

    /// [`Coin::round_amount`] without the trip back to `f64`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Coin::round_amount`].
    pub fn round_amount_decimal(&self, amount: f64) -> Result<Decimal, PairError> {
        let prec = self.amount_precision()?;
        let value = Decimal::from_f64(amount)
            .ok_or_else(|| PairError::NonFiniteAmount(amount.to_string()))?;
        Ok(value.round_dp_with_strategy(prec, RoundingStrategy::ToZero))
    }

    /// Renders a profit denominated in this coin, e.g. `$ 12.35`.
    #[must_use]
    pub fn format_profit(&self, value: f64) -> String {
        match self {
            Self::Usdt => format!("$ {value:.2}"),
            Self::Eth => format!("Ξ {value:.5}"),
            _ => format!("{} {value:.6}", self.as_str().to_ascii_lowercase()),
        }
    }

    /// Renders a balance for chat reports, with the unit in backticks.
    ///
    /// Dust below the coin's display threshold renders as an empty string.
    #[must_use]
    pub fn render_amount(&self, amount: f64) -> String {
        let (unit, prec, grouped, dust) = match self {
            Self::Usdt => ("$", 0, true, amount.abs() < 1.0),
            Self::Bnb => ("BNB", 1, true, amount.abs() < 0.1),
            Self::Btc => ("฿", 4, false, amount.abs() < 1e-4),
            Self::Eth => ("Ξ", 3, false, false),
            Self::Iotx => ("I", 0, true, amount == 0.0),
            Self::Zrx => ("Z", 0, true, amount == 0.0),
            Self::Ont => ("O", 0, true, amount == 0.0),
            Self::Ft => ("F", 0, true, amount < 10.0),
            _ => (self.as_str(), 0, true, amount < 1e-2),
        };
        if dust {
            return String::new();
        }
        let number = Decimal::from_f64(amount).map_or_else(
            || amount.to_string(),
            |d| {
                let d = d.round_dp_with_strategy(prec, RoundingStrategy::MidpointAwayFromZero);
                format!("{d:.prec$}", prec = prec as usize)
            },
        );
        if grouped {
            format!("`{unit} `{}", group_thousands(&number))
        } else {
            format!("`{unit} `{number}")
        }
    }
}

/// Inserts `,` between every three digits of the integer part.
fn group_thousands(number: &str) -> String {
    let (sign, unsigned) = number
        .strip_prefix('-')
        .map_or(("", number), |rest| ("-", rest));
    let (int, frac) = unsigned
        .split_once('.')
        .map_or((unsigned, None), |(i, f)| (i, Some(f)));

    let mut grouped = String::with_capacity(number.len() + int.len() / 3);
    grouped.push_str(sign);
    for (i, digit) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(frac) = frac {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Coin {
    type Err = PairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == upper)
            .ok_or(PairError::UnknownCoin(upper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_coin_parse_case_insensitive() {
        assert_eq!("eth".parse::<Coin>().unwrap(), Coin::Eth);
        assert_eq!(" USDT ".parse::<Coin>().unwrap(), Coin::Usdt);
    }

    #[test]
    fn test_coin_parse_unknown() {
        let err = "DOGE".parse::<Coin>().unwrap_err();
        assert_eq!(err, PairError::UnknownCoin("DOGE".to_string()));
    }

    #[test]
    fn test_coin_display_matches_parse() {
        for coin in Coin::ALL {
            assert_eq!(coin.to_string().parse::<Coin>().unwrap(), coin);
        }
    }

    #[test]
    fn test_coin_serde() {
        let json = serde_json::to_string(&Coin::Iotx).unwrap();
        assert_eq!(json, "\"IOTX\"");
        let parsed: Coin = serde_json::from_str("\"NEO\"").unwrap();
        assert_eq!(parsed, Coin::Neo);
    }

    #[test]
    fn test_round_amount_truncates_to_lot() {
        assert_eq!(Coin::Btc.round_amount_decimal(0.123_456_789).unwrap(), dec!(0.123456));
        assert_eq!(Coin::Eth.round_amount_decimal(1.999_9).unwrap(), dec!(1.999));
        assert_eq!(Coin::Ont.round_amount_decimal(-3.456).unwrap(), dec!(-3.45));
        assert_eq!(Coin::Iotx.round_amount(1234.99).unwrap(), 1234.0);
    }

    #[test]
    fn test_round_amount_errors() {
        assert_eq!(
            Coin::Usdt.round_amount(1.0).unwrap_err(),
            PairError::UnknownAmountPrecision {
                coin: "USDT".to_string()
            }
        );
        assert!(matches!(
            Coin::Btc.round_amount(f64::INFINITY),
            Err(PairError::NonFiniteAmount(_))
        ));
    }

    #[test]
    fn test_format_profit() {
        assert_eq!(Coin::Usdt.format_profit(12.346), "$ 12.35");
        assert_eq!(Coin::Eth.format_profit(-0.5), "Ξ -0.50000");
        assert_eq!(Coin::Btc.format_profit(0.25), "btc 0.250000");
    }

    #[test]
    fn test_render_amount() {
        assert_eq!(Coin::Usdt.render_amount(1_234_567.6), "`$ `1,234,568");
        assert_eq!(Coin::Usdt.render_amount(-0.5), "");
        assert_eq!(Coin::Btc.render_amount(1.234_56), "`฿ `1.2346");
        assert_eq!(Coin::Btc.render_amount(0.000_01), "");
        assert_eq!(Coin::Bnb.render_amount(-1234.5), "`BNB `-1,234.5");
        assert_eq!(Coin::Eth.render_amount(0.0), "`Ξ `0.000");
        assert_eq!(Coin::Iotx.render_amount(0.0), "");
        assert_eq!(Coin::Ft.render_amount(9.0), "");
        assert_eq!(Coin::Neo.render_amount(999.0), "`NEO `999");
    }

    #[test]
    fn test_coin_is_stable() {
        assert!(Coin::Usdt.is_stable());
        assert!(!Coin::Btc.is_stable());
    }
}
