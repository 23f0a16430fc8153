//! Order book core.
//!
//! An [`OrderBook`] is a pair of price ladders: bids strictly descending,
//! asks strictly ascending, at most one [`Order`] per price level. Every
//! price-producing query returns `NaN` (and zero amount) for a missing side
//! instead of failing, so callers can treat gaps in recorded data uniformly.

use serde::{Deserialize, Serialize};

use super::Side;

/// Amount reported by [`OrderBook::best_bid_or_floor`] for an empty bid side.
pub const FLOOR_BID_AMOUNT: f64 = 99.0;

/// Levels per side weighed by [`OrderBook::sb_ratio`].
pub const SB_RATIO_DEPTH: usize = 10;

/// A price level, or an order to be placed/matched.
///
/// Where a single value has to carry a side, a positive `amount` is a bid
/// (buy) and a negative `amount` is an ask (sell).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Order {
    /// Price level
    pub price: f64,
    /// Amount resting at the level, or signed order size
    pub amount: f64,
}

impl Order {
    /// Creates a new order.
    #[must_use]
    pub const fn new(price: f64, amount: f64) -> Self {
        Self { price, amount }
    }

    /// The "no such level" value: `NaN` price, zero amount.
    #[must_use]
    pub const fn missing() -> Self {
        Self {
            price: f64::NAN,
            amount: 0.0,
        }
    }

    /// Side encoded by the sign of `amount`.
    #[must_use]
    pub fn side(&self) -> Side {
        Side::from_amount(self.amount)
    }
}

/// Worst price touched when walking one side for a given size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthPrice {
    /// Worst level touched, `NaN` when the side is empty
    pub price: f64,
    /// Cumulative amount up to and including that level
    pub available: f64,
}

/// Result of [`OrderBook::price_in`] for both sides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceIn {
    /// Bid side walk
    pub bid: DepthPrice,
    /// Ask side walk
    pub ask: DepthPrice,
}

/// Liquidity depth by percentage band from the top of book.
///
/// Index `p` of each side holds the volume-weighted price and cumulative
/// amount of every level within `p`% of that side's best price, for
/// `p` in `0..=100`. A side with no levels yields an empty vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CumPctOrderBook {
    /// Bands below the best bid; `price` is the VWAP
    pub bids: Vec<Order>,
    /// Bands above the best ask; `price` is the VWAP
    pub asks: Vec<Order>,
}

/// Bid/ask ladder.
///
/// # Examples
///
/// ```
/// use bean_core::data::{Order, OrderBook};
///
/// let book = OrderBook::new(vec![Order::new(100.0, 1.0)], vec![Order::new(101.0, 1.0)]);
/// assert_eq!(book.mid(), 100.5);
/// assert_eq!(book.spread(), 1.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    bids: Vec<Order>,
    asks: Vec<Order>,
}

impl OrderBook {
    /// A book with no levels on either side.
    pub const EMPTY: Self = Self {
        bids: Vec::new(),
        asks: Vec::new(),
    };

    /// Creates a book from unsorted levels.
    ///
    /// Levels are sorted per side and levels sharing a price are merged.
    #[must_use]
    pub fn new(bids: Vec<Order>, asks: Vec<Order>) -> Self {
        Self {
            bids: normalize(bids, Ladder::Bid),
            asks: normalize(asks, Ladder::Ask),
        }
    }

    /// Bid levels, best first.
    #[must_use]
    pub fn bids(&self) -> &[Order] {
        &self.bids
    }

    /// Ask levels, best first.
    #[must_use]
    pub fn asks(&self) -> &[Order] {
        &self.asks
    }

    /// Both sides have at least one level.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.bids.is_empty() && !self.asks.is_empty()
    }

    /// Both sides show zero amount at the top of book.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.best_bid().amount == 0.0 && self.best_ask().amount == 0.0
    }

    /// Keeps at most `depth` levels per side.
    #[must_use]
    pub fn truncated(&self, depth: usize) -> Self {
        Self {
            bids: self.bids.iter().take(depth).copied().collect(),
            asks: self.asks.iter().take(depth).copied().collect(),
        }
    }

    /// Adds a bid. Returns true if its price is now the best bid.
    ///
    /// An existing level at the same price absorbs the amount.
    pub fn insert_bid(&mut self, order: Order) -> bool {
        insert(&mut self.bids, order, Ladder::Bid)
    }

    /// Adds an ask. Returns true if its price is now the best ask.
    ///
    /// An existing level at the same price absorbs the amount.
    pub fn insert_ask(&mut self, order: Order) -> bool {
        insert(&mut self.asks, order, Ladder::Ask)
    }

    /// Removes the bid level at `order.price`. Returns true if it was the best bid.
    pub fn cancel_bid(&mut self, order: Order) -> bool {
        cancel(&mut self.bids, order.price)
    }

    /// Removes the ask level at `order.price`. Returns true if it was the best ask.
    pub fn cancel_ask(&mut self, order: Order) -> bool {
        cancel(&mut self.asks, order.price)
    }

    /// Replaces the amount of the bid level at `order.price`; no-op if absent.
    /// Returns true if the edited level is the best bid.
    pub fn edit_bid(&mut self, order: Order) -> bool {
        edit(&mut self.bids, order)
    }

    /// Replaces the amount of the ask level at `order.price`; no-op if absent.
    /// Returns true if the edited level is the best ask.
    pub fn edit_ask(&mut self, order: Order) -> bool {
        edit(&mut self.asks, order)
    }

    /// Best bid, or [`Order::missing`] when there are no bids.
    #[must_use]
    pub fn best_bid(&self) -> Order {
        self.bids.first().copied().unwrap_or_else(Order::missing)
    }

    /// Best ask, or [`Order::missing`] when there are no asks.
    #[must_use]
    pub fn best_ask(&self) -> Order {
        self.asks.first().copied().unwrap_or_else(Order::missing)
    }

    /// Best bid, treating an empty side as a bid at price zero for
    /// [`FLOOR_BID_AMOUNT`].
    ///
    /// For callers that need a finite lower bound on what a coin can be sold
    /// for, e.g. marking inventory to a worst case.
    #[must_use]
    pub fn best_bid_or_floor(&self) -> Order {
        self.bids
            .first()
            .copied()
            .unwrap_or(Order::new(0.0, FLOOR_BID_AMOUNT))
    }

    /// Average of best bid and best ask; `NaN` unless both sides exist.
    #[must_use]
    pub fn mid(&self) -> f64 {
        if self.is_valid() {
            (self.bids[0].price + self.asks[0].price) / 2.0
        } else {
            f64::NAN
        }
    }

    /// Best ask minus best bid; `NaN` unless both sides exist.
    #[must_use]
    pub fn spread(&self) -> f64 {
        if self.is_valid() {
            self.asks[0].price - self.bids[0].price
        } else {
            f64::NAN
        }
    }

    /// Best bid, best ask and a mid that falls back to whichever side exists.
    #[must_use]
    pub fn bid_ask_mid(&self) -> (f64, f64, f64) {
        let bid = self.best_bid().price;
        let ask = self.best_ask().price;
        let mid = match (bid.is_nan(), ask.is_nan()) {
            (false, false) => (bid + ask) / 2.0,
            (true, false) => ask,
            (false, true) => bid,
            (true, true) => f64::NAN,
        };
        (bid, ask, mid)
    }

    /// True when both books exist and neither best price has moved.
    #[must_use]
    pub fn same_top(&self, other: &Self) -> bool {
        self.is_valid()
            && other.is_valid()
            && self.bids[0].price == other.bids[0].price
            && self.asks[0].price == other.asks[0].price
    }

    /// Folds levels smaller than `minimum_amount` into the next level on the
    /// same side.
    ///
    /// Dust carries forward cumulatively. Dust left after the last level is
    /// added to the last kept level; if no level reaches the minimum the side
    /// collapses to one order at its worst price. Total amount per side is
    /// unchanged.
    #[must_use]
    pub fn denoise(&self, minimum_amount: f64) -> Self {
        Self {
            bids: denoise_side(&self.bids, minimum_amount),
            asks: denoise_side(&self.asks, minimum_amount),
        }
    }

    /// Walks both sides for `size`.
    #[must_use]
    pub fn price_in(&self, size: f64) -> PriceIn {
        PriceIn {
            bid: self.bid_in(size),
            ask: self.ask_in(size),
        }
    }

    /// Worst bid that must be hit to sell `size`, and the amount available
    /// down to it.
    #[must_use]
    pub fn bid_in(&self, size: f64) -> DepthPrice {
        price_in_amount(size, &self.bids)
    }

    /// Worst ask that must be lifted to buy `size`, and the amount available
    /// up to it.
    #[must_use]
    pub fn ask_in(&self, size: f64) -> DepthPrice {
        price_in_amount(size, &self.asks)
    }

    /// Sell/buy pressure: discounted ask notional over discounted bid notional.
    ///
    /// The first [`SB_RATIO_DEPTH`] levels of each side are weighted by
    /// `alpha^i`, `alpha` in `(0, 1]`. Bid weights are further discounted by
    /// the spread measured in `tick`s, so a wide book leans towards the sell
    /// side. `NaN` unless both sides exist.
    #[must_use]
    pub fn sb_ratio(&self, alpha: f64, tick: f64) -> f64 {
        if !self.is_valid() {
            return f64::NAN;
        }
        let spread_ticks = self.spread() / tick;
        let sell: f64 = self
            .asks
            .iter()
            .take(SB_RATIO_DEPTH)
            .zip(0_i32..)
            .map(|(level, i)| alpha.powi(i) * level.price * level.amount)
            .sum();
        let buy: f64 = self
            .bids
            .iter()
            .take(SB_RATIO_DEPTH)
            .zip(0_i32..)
            .map(|(level, i)| {
                alpha.powf(spread_ticks - 1.0 + f64::from(i)) * level.price * level.amount
            })
            .sum();
        sell / buy
    }

    /// Volume-weighted depth in 1% bands out to 100% from the top of book.
    #[must_use]
    pub fn cum_pct_order_book(&self) -> CumPctOrderBook {
        CumPctOrderBook {
            bids: cum_pct_side(&self.bids, Ladder::Bid),
            asks: cum_pct_side(&self.asks, Ladder::Ask),
        }
    }

    /// Fills a marketable order against the book without mutating it.
    ///
    /// A buy (`amount > 0`) takes asks priced at or below `placed.price`; a
    /// sell takes bids priced at or above it. Returns the average fill price
    /// and the signed filled amount, or `(0, 0)` when nothing crosses.
    #[must_use]
    pub fn match_order(&self, placed: Order) -> Order {
        let (levels, wanted, sign) = if placed.amount > 0.0 {
            (&self.asks, placed.amount, 1.0)
        } else {
            (&self.bids, -placed.amount, -1.0)
        };

        let mut notional = 0.0;
        let mut filled = 0.0;
        for level in levels {
            let crosses = if sign > 0.0 {
                level.price <= placed.price
            } else {
                level.price >= placed.price
            };
            if !crosses || filled >= wanted {
                break;
            }
            let take = (wanted - filled).min(level.amount);
            notional += take * level.price;
            filled += take;
        }

        if filled > 0.0 {
            Order::new(notional / filled, sign * filled)
        } else {
            Order::new(0.0, 0.0)
        }
    }
}

#[derive(Clone, Copy)]
enum Ladder {
    Bid,
    Ask,
}

impl Ladder {
    fn sort(self, levels: &mut [Order]) {
        match self {
            Self::Bid => levels.sort_by(|a, b| b.price.total_cmp(&a.price)),
            Self::Ask => levels.sort_by(|a, b| a.price.total_cmp(&b.price)),
        }
    }
}

fn normalize(mut levels: Vec<Order>, ladder: Ladder) -> Vec<Order> {
    ladder.sort(&mut levels);
    let mut merged: Vec<Order> = Vec::with_capacity(levels.len());
    for level in levels {
        match merged.last_mut() {
            Some(last) if last.price == level.price => last.amount += level.amount,
            _ => merged.push(level),
        }
    }
    merged
}

fn insert(levels: &mut Vec<Order>, order: Order, ladder: Ladder) -> bool {
    if let Some(existing) = levels.iter_mut().find(|o| o.price == order.price) {
        existing.amount += order.amount;
    } else {
        levels.push(order);
        ladder.sort(levels);
    }
    levels[0].price == order.price
}

fn cancel(levels: &mut Vec<Order>, price: f64) -> bool {
    match levels.iter().position(|o| o.price == price) {
        Some(index) => {
            levels.remove(index);
            index == 0
        }
        None => false,
    }
}

fn edit(levels: &mut [Order], order: Order) -> bool {
    match levels.iter().position(|o| o.price == order.price) {
        Some(index) => {
            levels[index].amount = order.amount;
            index == 0
        }
        None => false,
    }
}

fn denoise_side(levels: &[Order], minimum_amount: f64) -> Vec<Order> {
    let mut kept: Vec<Order> = Vec::with_capacity(levels.len());
    let mut carry = 0.0;
    for level in levels {
        let amount = level.amount + carry;
        if amount < minimum_amount {
            carry = amount;
        } else {
            kept.push(Order::new(level.price, amount));
            carry = 0.0;
        }
    }
    if carry != 0.0 {
        match (kept.last_mut(), levels.last()) {
            (Some(last), _) => last.amount += carry,
            (None, Some(worst)) => kept.push(Order::new(worst.price, carry)),
            (None, None) => {}
        }
    }
    kept
}

fn price_in_amount(required: f64, levels: &[Order]) -> DepthPrice {
    let Some(worst) = levels.last() else {
        return DepthPrice {
            price: f64::NAN,
            available: 0.0,
        };
    };
    let mut available = 0.0;
    for level in levels {
        available += level.amount;
        if available > required {
            return DepthPrice {
                price: level.price,
                available,
            };
        }
    }
    DepthPrice {
        price: worst.price,
        available,
    }
}

fn cum_pct_side(levels: &[Order], ladder: Ladder) -> Vec<Order> {
    let Some(best) = levels.first() else {
        return Vec::new();
    };
    (0..=100u32)
        .map(|pct| {
            let band = f64::from(pct) / 100.0;
            let (notional, amount) = levels
                .iter()
                .take_while(|o| match ladder {
                    Ladder::Bid => o.price >= best.price * (1.0 - band),
                    Ladder::Ask => o.price <= best.price * (1.0 + band),
                })
                .fold((0.0, 0.0), |(n, a), o| (n + o.price * o.amount, a + o.amount));
            let vwap = if amount > 0.0 { notional / amount } else { f64::NAN };
            Order::new(vwap, amount)
        })
        .collect()
}
