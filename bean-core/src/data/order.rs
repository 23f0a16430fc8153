//! Order lifecycle and status models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Coin;

/// State of an order placed with an exchange.
///
/// `Alive` is the only non-terminal state; an order leaves it exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderState {
    /// Resting and eligible to fill
    Alive,
    /// Completely filled
    Filled,
    /// Cancelled before completing
    Cancelled,
}

impl OrderState {
    /// Returns true for `Filled` and `Cancelled`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Filled | Self::Cancelled)
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alive => write!(f, "ALIVE"),
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy
    Buy,
    /// Sell
    Sell,
}

impl Side {
    /// Side encoded by a signed amount. Zero counts as a buy.
    #[must_use]
    pub fn from_amount(amount: f64) -> Self {
        if amount < 0.0 { Self::Sell } else { Self::Buy }
    }

    /// `1.0` for buys, `-1.0` for sells.
    #[must_use]
    pub const fn sign(&self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Which side of a trade provided liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Maker {
    /// The resting order was a bid
    Buyer,
    /// The resting order was an ask
    Seller,
}

impl Maker {
    /// Maker side for a signed fill amount.
    #[must_use]
    pub fn from_amount(amount: f64) -> Self {
        if amount > 0.0 { Self::Buyer } else { Self::Seller }
    }
}

/// Status of an order as reported by an exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatus {
    /// Exchange order id
    pub order_id: String,
    /// Time the order was accepted
    pub placed_time: DateTime<Utc>,
    /// Order side
    pub side: Side,
    /// Unsigned amount filled so far
    pub filled_amount: f64,
    /// Unsigned amount still resting
    pub left_amount: f64,
    /// Limit price at placement
    pub placed_price: f64,
    /// Average fill price, or the placed price when nothing filled
    pub price: f64,
    /// Current state
    pub state: OrderState,
    /// Commission charged
    pub commission: f64,
    /// Asset the commission was charged in
    pub commission_asset: Option<Coin>,
}
