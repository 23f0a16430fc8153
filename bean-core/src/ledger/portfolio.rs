//! Per-coin balance ledger with locked collateral and contract holdings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::contract::{Contract, Position};
use crate::data::TradeLog;
use crate::types::{Coin, Pair};

/// Balances, locked balances and contract positions for one account.
///
/// `available_balance(c) == balance(c) - locked_balance(c)` for every coin.
/// Locked amounts are bookkeeping for resting orders and are not clamped
/// against the total balance.
///
/// `Clone` is a deep copy including locked balances. The algebra
/// ([`Portfolio::add`], [`Portfolio::subtract`]) carries balances and
/// contracts only.
///
/// # Examples
///
/// ```
/// use bean_core::ledger::Portfolio;
/// use bean_core::types::Coin;
///
/// let mut p = Portfolio::with_balances([(Coin::Usdt, 1000.0)]);
/// p.set_locked_balance(Coin::Usdt, 250.0);
/// assert_eq!(p.available_balance(Coin::Usdt), 750.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    #[serde(default)]
    balances: BTreeMap<Coin, f64>,
    #[serde(default)]
    locked_balances: BTreeMap<Coin, f64>,
    #[serde(default)]
    contracts: Vec<Position>,
}

impl Portfolio {
    /// An empty portfolio.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A portfolio holding `balances`, nothing locked.
    #[must_use]
    pub fn with_balances(balances: impl IntoIterator<Item = (Coin, f64)>) -> Self {
        Self {
            balances: balances.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Total balance of `coin`, zero if never touched.
    #[must_use]
    pub fn balance(&self, coin: Coin) -> f64 {
        self.balances.get(&coin).copied().unwrap_or_default()
    }

    /// All balances.
    #[must_use]
    pub const fn balances(&self) -> &BTreeMap<Coin, f64> {
        &self.balances
    }

    /// Coins with a balance entry, in coin order.
    #[must_use]
    pub fn coins(&self) -> Vec<Coin> {
        self.balances.keys().copied().collect()
    }

    /// Adds `amount` (may be negative) to `coin`.
    pub fn add_balance(&mut self, coin: Coin, amount: f64) {
        *self.balances.entry(coin).or_default() += amount;
    }

    /// Removes `amount` from `coin`.
    pub fn remove_balance(&mut self, coin: Coin, amount: f64) {
        self.add_balance(coin, -amount);
    }

    /// Overwrites the balance of `coin`.
    pub fn set_balance(&mut self, coin: Coin, amount: f64) {
        self.balances.insert(coin, amount);
    }

    /// Collateral locked in `coin`, zero if none.
    #[must_use]
    pub fn locked_balance(&self, coin: Coin) -> f64 {
        self.locked_balances.get(&coin).copied().unwrap_or_default()
    }

    /// All locked balances.
    #[must_use]
    pub const fn locked_balances(&self) -> &BTreeMap<Coin, f64> {
        &self.locked_balances
    }

    /// Overwrites the locked amount of `coin`.
    pub fn set_locked_balance(&mut self, coin: Coin, amount: f64) {
        self.locked_balances.insert(coin, amount);
    }

    /// Adds `amount` (may be negative) to the locked amount of `coin`.
    pub fn add_locked_balance(&mut self, coin: Coin, amount: f64) {
        *self.locked_balances.entry(coin).or_default() += amount;
    }

    /// Balance not reserved by resting orders.
    #[must_use]
    pub fn available_balance(&self, coin: Coin) -> f64 {
        self.balance(coin) - self.locked_balance(coin)
    }

    /// Pointwise sum of balances and contracts.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        self.combine(other, 1.0)
    }

    /// Pointwise difference `self - other` of balances and contracts.
    #[must_use]
    pub fn subtract(&self, other: &Self) -> Self {
        self.combine(other, -1.0)
    }

    /// Same as [`Portfolio::subtract`].
    #[must_use]
    pub fn minus(&self, other: &Self) -> Self {
        self.subtract(other)
    }

    fn combine(&self, other: &Self, sign: f64) -> Self {
        let mut result = Self {
            balances: self.balances.clone(),
            locked_balances: BTreeMap::new(),
            contracts: self.contracts.clone(),
        };
        for (coin, amount) in &other.balances {
            result.add_balance(*coin, sign * amount);
        }
        for position in &other.contracts {
            result.add_contract(
                Arc::clone(&position.contract),
                sign * position.quantity,
                position.price,
            );
        }
        result
    }

    /// Sub-portfolio restricted to `coins`, locked amounts included.
    ///
    /// Every requested coin gets a balance entry, zero if absent here.
    #[must_use]
    pub fn filter(&self, coins: &[Coin]) -> Self {
        let mut result = Self::new();
        for coin in coins {
            result.set_balance(*coin, self.balance(*coin));
            if let Some(locked) = self.locked_balances.get(coin) {
                result.set_locked_balance(*coin, *locked);
            }
        }
        result
    }

    /// Adds `quantity` of `contract` at `price`.
    ///
    /// Repeated contracts accumulate into one position whose price is the
    /// quantity-weighted average of additions on the same side.
    pub fn add_contract(&mut self, contract: Arc<Contract>, quantity: f64, price: f64) {
        match self.contracts.iter_mut().find(|p| *p.contract == *contract) {
            Some(position) => {
                let total = position.quantity + quantity;
                if position.quantity.signum() == quantity.signum() && total != 0.0 {
                    position.price =
                        (position.price * position.quantity + price * quantity) / total;
                } else if total.signum() != position.quantity.signum() {
                    position.price = price;
                }
                position.quantity = total;
            }
            None => self.contracts.push(Position::new(contract, quantity, price)),
        }
    }

    /// Contract positions in insertion order.
    #[must_use]
    pub fn contracts(&self) -> &[Position] {
        &self.contracts
    }

    /// Net quantity held in `contract`.
    #[must_use]
    pub fn contract_quantity(&self, contract: &Contract) -> f64 {
        self.contracts
            .iter()
            .filter(|p| *p.contract == *contract)
            .map(|p| p.quantity)
            .sum()
    }

    /// Applies a signed spot fill: `amount` of `pair.coin` at `price`.
    pub fn apply_fill(&mut self, pair: Pair, price: f64, amount: f64) {
        self.add_balance(pair.coin, amount);
        self.add_balance(pair.base, -amount * price);
    }

    /// The portfolio after `trades`, commission included.
    #[must_use]
    pub fn age(&self, trades: &[TradeLog]) -> Self {
        let mut result = self.clone();
        for trade in trades {
            result.apply_fill(trade.pair, trade.price, trade.signed_quantity());
            if let Some(asset) = trade.commission_asset {
                result.remove_balance(asset, trade.commission);
            }
        }
        result
    }

    /// Net balance change from `trades` alone.
    #[must_use]
    pub fn net(trades: &[TradeLog]) -> Self {
        Self::new().age(trades)
    }
}
