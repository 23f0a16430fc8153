//! Derivative contract identity and the contract name grammar.
//!
//! Names follow the venue convention:
//!
//! | name                    | kind      |
//! |-------------------------|-----------|
//! | `BTC-PERPETUAL`         | perpetual |
//! | `BTC-INDEX`             | index     |
//! | `BTC-DERIBIT-INDEX`     | index     |
//! | `BTC-29MAR19`           | future    |
//! | `BTC-29MAR19-3500-C`    | option    |
//!
//! Dates are `DMMMYY` or `DDMMMYY` and always expire at 08:00 UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::ContractError;
use crate::types::{Coin, Pair};

/// UTC hour at which dated contracts expire.
pub const EXPIRY_HOUR: u32 = 8;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Kind of derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    /// Dated future
    Future,
    /// European option on the dated future
    Option,
    /// Perpetual swap
    Perpetual,
    /// Price index; `deribit` selects the `COIN-DERIBIT-INDEX` rendering
    Index {
        /// Venue specific index name
        deribit: bool,
    },
}

/// Option flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallPut {
    /// Call
    Call,
    /// Put
    Put,
    /// Not an option
    None,
}

impl CallPut {
    /// The opposite flag; `None` stays `None`.
    #[must_use]
    pub const fn mirror(self) -> Self {
        match self {
            Self::Call => Self::Put,
            Self::Put => Self::Call,
            Self::None => Self::None,
        }
    }
}

impl fmt::Display for CallPut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "C"),
            Self::Put => write!(f, "P"),
            Self::None => write!(f, "N"),
        }
    }
}

/// A derivative instrument.
///
/// Equality follows instrument identity: options compare every field,
/// futures compare underlying and expiry, perpetuals and indices compare
/// kind and underlying only.
///
/// # Examples
///
/// ```
/// use bean_core::contract::Contract;
///
/// let c: Contract = "BTC-2FEB20-9000-C".parse().unwrap();
/// assert!(c.is_option());
/// assert_eq!(c.name(), "BTC-2FEB20-9000-C");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Contract {
    kind: ContractKind,
    underlying: Pair,
    expiry: DateTime<Utc>,
    delivery: DateTime<Utc>,
    strike: f64,
    call_put: CallPut,
}

impl Contract {
    /// Perpetual swap on `underlying`.
    #[must_use]
    pub fn perpetual(underlying: Pair) -> Self {
        Self::undated(ContractKind::Perpetual, underlying)
    }

    /// Price index on `underlying`.
    #[must_use]
    pub fn index(underlying: Pair, deribit: bool) -> Self {
        Self::undated(ContractKind::Index { deribit }, underlying)
    }

    /// Future delivering on the UTC date of `expiry`, at 08:00.
    #[must_use]
    pub fn future(underlying: Pair, expiry: DateTime<Utc>) -> Self {
        let expiry = expiry_on_date(expiry);
        Self {
            kind: ContractKind::Future,
            underlying,
            expiry,
            delivery: expiry,
            strike: 0.0,
            call_put: CallPut::None,
        }
    }

    /// Option expiring on the UTC date of `expiry`, at 08:00.
    ///
    /// The strike is rounded to a whole, non-negative number so that the
    /// contract survives a trip through its name.
    #[must_use]
    pub fn option(underlying: Pair, expiry: DateTime<Utc>, strike: f64, call_put: CallPut) -> Self {
        let expiry = expiry_on_date(expiry);
        let strike = strike.round();
        Self {
            kind: ContractKind::Option,
            underlying,
            expiry,
            delivery: expiry,
            strike: if strike > 0.0 { strike } else { 0.0 },
            call_put,
        }
    }

    fn undated(kind: ContractKind, underlying: Pair) -> Self {
        let expiry = undated_expiry();
        Self {
            kind,
            underlying,
            expiry,
            delivery: expiry,
            strike: 0.0,
            call_put: CallPut::None,
        }
    }

    /// Canonical name, e.g. `BTC-2FEB20-9000-C`.
    #[must_use]
    pub fn name(&self) -> String {
        let coin = self.underlying.coin;
        match self.kind {
            ContractKind::Perpetual => format!("{coin}-PERPETUAL"),
            ContractKind::Index { deribit: false } => format!("{coin}-INDEX"),
            ContractKind::Index { deribit: true } => format!("{coin}-DERIBIT-INDEX"),
            ContractKind::Future => format!("{coin}-{}", format_expiry(self.expiry)),
            ContractKind::Option => format!(
                "{coin}-{}-{:.0}-{}",
                format_expiry(self.expiry),
                self.strike,
                self.call_put
            ),
        }
    }

    /// Instrument kind.
    #[must_use]
    pub const fn kind(&self) -> ContractKind {
        self.kind
    }

    /// Underlying pair, always quoted in USD.
    #[must_use]
    pub const fn underlying(&self) -> Pair {
        self.underlying
    }

    /// Expiry time. Undated contracts report 1970-01-01 08:00 UTC.
    #[must_use]
    pub const fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    /// Delivery time.
    #[must_use]
    pub const fn delivery(&self) -> DateTime<Utc> {
        self.delivery
    }

    /// Strike; zero for anything but options.
    #[must_use]
    pub const fn strike(&self) -> f64 {
        self.strike
    }

    /// Option flag.
    #[must_use]
    pub const fn call_put(&self) -> CallPut {
        self.call_put
    }

    /// True for options.
    #[must_use]
    pub const fn is_option(&self) -> bool {
        matches!(self.kind, ContractKind::Option)
    }

    /// True for perpetual swaps.
    #[must_use]
    pub const fn is_perpetual(&self) -> bool {
        matches!(self.kind, ContractKind::Perpetual)
    }

    /// Whole days from `asof` to expiry.
    #[must_use]
    pub fn expiry_days(&self, asof: DateTime<Utc>) -> i64 {
        day_diff(asof, self.expiry)
    }

    /// The future an option is written on. Non-options map to themselves.
    #[must_use]
    pub fn under_future(&self) -> Self {
        if self.is_option() {
            Self::future(self.underlying, self.expiry)
        } else {
            self.clone()
        }
    }

    /// The same option with the opposite flag.
    #[must_use]
    pub fn call_put_mirror(&self) -> Self {
        Self {
            call_put: self.call_put.mirror(),
            ..self.clone()
        }
    }
}

impl PartialEq for Contract {
    fn eq(&self, other: &Self) -> bool {
        match (self.kind, other.kind) {
            (ContractKind::Option, ContractKind::Option) => {
                self.underlying == other.underlying
                    && self.expiry == other.expiry
                    && self.delivery == other.delivery
                    && self.strike == other.strike
                    && self.call_put == other.call_put
            }
            (ContractKind::Future, ContractKind::Future) => {
                self.underlying == other.underlying && self.expiry == other.expiry
            }
            (a, b) => a == b && self.underlying == other.underlying,
        }
    }
}

impl Eq for Contract {}

impl Hash for Contract {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.underlying.hash(state);
        match self.kind {
            ContractKind::Option => {
                self.expiry.hash(state);
                self.strike.to_bits().hash(state);
                self.call_put.hash(state);
            }
            ContractKind::Future => self.expiry.hash(state),
            ContractKind::Perpetual | ContractKind::Index { .. } => {}
        }
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Contract {
    type Err = ContractError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = name.split('-').collect();
        let bad_formation = || ContractError::BadFormation {
            name: name.to_string(),
        };
        if parts.len() < 2 {
            return Err(bad_formation());
        }

        let underlying = match parts[0] {
            "BTC" => Pair::new(Coin::Btc, Coin::Usd),
            "ETH" => Pair::new(Coin::Eth, Coin::Usd),
            other => {
                return Err(ContractError::UnknownCoin {
                    coin: other.to_string(),
                });
            }
        };

        match parts.as_slice() {
            [_, "PERPETUAL"] => Ok(Self::perpetual(underlying)),
            [_, "INDEX"] => Ok(Self::index(underlying, false)),
            [_, "DERIBIT", "INDEX"] => Ok(Self::index(underlying, true)),
            [_, date] => Ok(Self::future(underlying, parse_expiry(date)?)),
            [_, date, strike, flag] => {
                let expiry = parse_expiry(date)?;
                let strike = strike
                    .parse::<u32>()
                    .map_err(|_| ContractError::BadStrike {
                        strike: (*strike).to_string(),
                    })?;
                let call_put = match *flag {
                    "C" => CallPut::Call,
                    "P" => CallPut::Put,
                    other => {
                        return Err(ContractError::BadCallPut {
                            flag: other.to_string(),
                        });
                    }
                };
                Ok(Self::option(underlying, expiry, f64::from(strike), call_put))
            }
            _ => Err(bad_formation()),
        }
    }
}

impl TryFrom<String> for Contract {
    type Error = ContractError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Contract> for String {
    fn from(c: Contract) -> Self {
        c.name()
    }
}

/// Whole days between the calendar dates of `from` and `to`, in UTC.
#[must_use]
pub fn day_diff(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to.date_naive() - from.date_naive()).num_days()
}

/// 08:00 UTC on the UTC date of `t`.
#[must_use]
pub fn expiry_on_date(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive()
        .and_hms_opt(EXPIRY_HOUR, 0, 0)
        .map_or(t, |dt| Utc.from_utc_datetime(&dt))
}

fn undated_expiry() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::hours(i64::from(EXPIRY_HOUR))
}

/// Parses `DMMMYY` / `DDMMMYY` into 08:00 UTC on that date.
pub fn parse_expiry(s: &str) -> Result<DateTime<Utc>, ContractError> {
    let bad_date = || ContractError::BadDate {
        date: s.to_string(),
    };
    let split = match s.len() {
        6 => 1,
        7 => 2,
        _ => return Err(bad_date()),
    };
    let (day, rest) = s.split_at_checked(split).ok_or_else(bad_date)?;
    let (month, year) = rest.split_at_checked(3).ok_or_else(bad_date)?;

    let day: u32 = day.parse().map_err(|_| bad_date())?;
    let year: i32 = year.parse().map_err(|_| bad_date())?;
    let month = MONTHS
        .iter()
        .position(|m| *m == month)
        .and_then(|i| u32::try_from(i + 1).ok())
        .ok_or_else(bad_date)?;

    NaiveDate::from_ymd_opt(year + 2000, month, day)
        .and_then(|d| d.and_hms_opt(EXPIRY_HOUR, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
        .ok_or_else(bad_date)
}

/// Renders an expiry as `2FEB20`: no leading zero, upper case.
#[must_use]
pub fn format_expiry(t: DateTime<Utc>) -> String {
    let month = usize::try_from(t.month0())
        .ok()
        .and_then(|m| MONTHS.get(m))
        .copied()
        .unwrap_or("???");
    format!("{}{}{:02}", t.day(), month, t.year() % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_expiry(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 8, 0, 0).unwrap()
    }

    fn btc() -> Pair {
        Pair::new(Coin::Btc, Coin::Usd)
    }

    #[test]
    fn test_parse_future() {
        let c: Contract = "BTC-29MAR19".parse().unwrap();
        assert_eq!(c.kind(), ContractKind::Future);
        assert_eq!(c.expiry(), create_expiry(2019, 3, 29));
        assert_eq!(c.delivery(), c.expiry());
        assert_eq!(c.underlying(), btc());
        assert_eq!(c.call_put(), CallPut::None);
    }

    #[test]
    fn test_parse_option() {
        let c: Contract = "ETH-2FEB20-250-P".parse().unwrap();
        assert!(c.is_option());
        assert_eq!(c.underlying(), Pair::new(Coin::Eth, Coin::Usd));
        assert_eq!(c.expiry(), create_expiry(2020, 2, 2));
        assert!((c.strike() - 250.0).abs() < f64::EPSILON);
        assert_eq!(c.call_put(), CallPut::Put);
    }

    #[test]
    fn test_parse_undated() {
        assert!("BTC-PERPETUAL".parse::<Contract>().unwrap().is_perpetual());
        assert_eq!(
            "BTC-INDEX".parse::<Contract>().unwrap().kind(),
            ContractKind::Index { deribit: false }
        );
        assert_eq!(
            "ETH-DERIBIT-INDEX".parse::<Contract>().unwrap().kind(),
            ContractKind::Index { deribit: true }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "BTC".parse::<Contract>(),
            Err(ContractError::BadFormation { .. })
        ));
        assert!(matches!(
            "XRP-PERPETUAL".parse::<Contract>(),
            Err(ContractError::UnknownCoin { .. })
        ));
        assert!(matches!(
            "BTC-29XYZ19".parse::<Contract>(),
            Err(ContractError::BadDate { .. })
        ));
        assert!(matches!(
            "BTC-31FEB19".parse::<Contract>(),
            Err(ContractError::BadDate { .. })
        ));
        assert!(matches!(
            "BTC-29MAR19-abc-C".parse::<Contract>(),
            Err(ContractError::BadStrike { .. })
        ));
        assert!(matches!(
            "BTC-29MAR19-3500-X".parse::<Contract>(),
            Err(ContractError::BadCallPut { .. })
        ));
        assert!(matches!(
            "BTC-29MAR19-3500".parse::<Contract>(),
            Err(ContractError::BadFormation { .. })
        ));
    }

    #[test]
    fn test_name_round_trip() {
        let contracts = [
            Contract::perpetual(btc()),
            Contract::index(btc(), false),
            Contract::index(btc(), true),
            Contract::future(btc(), create_expiry(2020, 2, 2)),
            Contract::future(btc(), create_expiry(2021, 12, 31)),
            Contract::option(btc(), create_expiry(2020, 2, 2), 9000.0, CallPut::Call),
            Contract::option(btc(), create_expiry(2019, 3, 29), 3500.0, CallPut::Put),
        ];
        for c in contracts {
            let parsed: Contract = c.name().parse().unwrap();
            assert_eq!(parsed, c, "{}", c.name());
            assert_eq!(parsed.name(), c.name());
        }
    }

    #[test]
    fn test_constructors_canonicalise() {
        let afternoon = Utc.with_ymd_and_hms(2020, 2, 2, 15, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2020, 2, 2, 23, 59, 59).unwrap();
        let contracts = [
            Contract::future(btc(), afternoon),
            Contract::future(btc(), late),
            Contract::option(btc(), afternoon, 9000.5, CallPut::Call),
            Contract::option(btc(), late, 8999.6, CallPut::Put),
            Contract::option(btc(), afternoon, -5.0, CallPut::Call),
        ];
        for c in contracts {
            assert_eq!(c.expiry(), create_expiry(2020, 2, 2), "{}", c.name());
            assert_eq!(c.delivery(), c.expiry());
            let parsed: Contract = c.name().parse().unwrap();
            assert_eq!(parsed, c, "{}", c.name());
            assert!((parsed.strike() - c.strike()).abs() < f64::EPSILON);
        }

        let call = Contract::option(btc(), afternoon, 9000.5, CallPut::Call);
        assert_eq!(call.name(), "BTC-2FEB20-9001-C");
        assert!((call.strike() - 9001.0).abs() < f64::EPSILON);
        let floored = Contract::option(btc(), afternoon, -5.0, CallPut::Call);
        assert_eq!(floored.name(), "BTC-2FEB20-0-C");
    }

    #[test]
    fn test_name_format() {
        let c = Contract::option(btc(), create_expiry(2020, 2, 2), 9000.0, CallPut::Call);
        assert_eq!(c.name(), "BTC-2FEB20-9000-C");
        assert_eq!(c.to_string(), "BTC-2FEB20-9000-C");
        assert_eq!(format_expiry(create_expiry(2019, 3, 29)), "29MAR19");
    }

    #[test]
    fn test_equality() {
        let e1 = create_expiry(2020, 3, 27);
        let e2 = create_expiry(2020, 6, 26);
        assert_eq!(Contract::perpetual(btc()), Contract::perpetual(btc()));
        assert_ne!(Contract::perpetual(btc()), Contract::index(btc(), false));
        assert_ne!(Contract::future(btc(), e1), Contract::future(btc(), e2));
        assert_ne!(
            Contract::option(btc(), e1, 9000.0, CallPut::Call),
            Contract::option(btc(), e1, 9000.0, CallPut::Put)
        );
        assert_ne!(
            Contract::option(btc(), e1, 9000.0, CallPut::Call),
            Contract::future(btc(), e1)
        );
    }

    #[test]
    fn test_under_future_and_mirror() {
        let e = create_expiry(2020, 3, 27);
        let call = Contract::option(btc(), e, 9000.0, CallPut::Call);
        assert_eq!(call.under_future(), Contract::future(btc(), e));
        assert_eq!(call.under_future().name(), "BTC-27MAR20");
        let put = call.call_put_mirror();
        assert_eq!(put.call_put(), CallPut::Put);
        assert_eq!(put.call_put_mirror(), call);
        let perp = Contract::perpetual(btc());
        assert_eq!(perp.under_future(), perp);
    }

    #[test]
    fn test_day_diff() {
        let asof = Utc.with_ymd_and_hms(2020, 3, 1, 23, 59, 0).unwrap();
        assert_eq!(day_diff(asof, create_expiry(2020, 3, 2)), 1);
        assert_eq!(day_diff(asof, create_expiry(2020, 3, 1)), 0);
        assert_eq!(day_diff(create_expiry(2020, 3, 2), asof), -1);
        let c = Contract::future(btc(), create_expiry(2020, 3, 31));
        assert_eq!(c.expiry_days(asof), 30);
    }

    #[test]
    fn test_serde_as_name() {
        let c: Contract = "BTC-27MAR20".parse().unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"BTC-27MAR20\"");
        let parsed: Contract = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, c);
    }
}
