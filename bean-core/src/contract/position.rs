//! Contract positions.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

use super::{Contract, ContractCache};
use crate::error::ContractError;

/// A holding in one contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Instrument held
    pub contract: Arc<Contract>,
    /// Signed quantity
    pub quantity: f64,
    /// Average entry price, in the contract's quote convention
    pub price: f64,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub const fn new(contract: Arc<Contract>, quantity: f64, price: f64) -> Self {
        Self {
            contract,
            quantity,
            price,
        }
    }
}

/// Resolves `names` through `cache` into positions.
///
/// Quantities and prices are read by index; when either slice is absent every
/// position is flat at price zero.
pub fn positions_from_names(
    cache: &ContractCache,
    names: &[&str],
    quantities: Option<&[f64]>,
    prices: Option<&[f64]>,
) -> Result<Vec<Position>, ContractError> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let contract = cache.resolve(name)?;
            let (quantity, price) = match (quantities, prices) {
                (Some(q), Some(p)) => (
                    q.get(i).copied().unwrap_or_default(),
                    p.get(i).copied().unwrap_or_default(),
                ),
                _ => (0.0, 0.0),
            };
            Ok(Position::new(contract, quantity, price))
        })
        .collect()
}

/// Sorts by delivery, then futures before options, then by strike.
pub fn sort_positions(positions: &mut [Position]) {
    positions.sort_by(|a, b| {
        let (ca, cb) = (&a.contract, &b.contract);
        ca.delivery()
            .cmp(&cb.delivery())
            .then_with(|| match (ca.is_option(), cb.is_option()) {
                (false, true) => Ordering::Less,
                (true, false) => Ordering::Greater,
                _ => Ordering::Equal,
            })
            .then_with(|| ca.strike().total_cmp(&cb.strike()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_from_names() {
        let cache = ContractCache::new();
        let positions = positions_from_names(
            &cache,
            &["BTC-27MAR20", "BTC-27MAR20-9000-C"],
            Some(&[1.0, -2.0]),
            Some(&[9100.0, 0.05]),
        )
        .unwrap();
        assert_eq!(positions.len(), 2);
        assert!((positions[1].quantity + 2.0).abs() < f64::EPSILON);
        assert!((positions[1].price - 0.05).abs() < f64::EPSILON);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_positions_from_names_flat() {
        let cache = ContractCache::new();
        let positions = positions_from_names(&cache, &["ETH-PERPETUAL"], None, None).unwrap();
        assert_eq!(positions[0].quantity, 0.0);
        assert!(positions_from_names(&cache, &["ETH-X"], None, None).is_err());
    }

    #[test]
    fn test_sort_positions() {
        let cache = ContractCache::new();
        let mut positions = positions_from_names(
            &cache,
            &[
                "BTC-26JUN20-8000-P",
                "BTC-27MAR20-9000-C",
                "BTC-26JUN20",
                "BTC-27MAR20-7000-C",
                "BTC-27MAR20",
            ],
            None,
            None,
        )
        .unwrap();
        sort_positions(&mut positions);
        let names: Vec<String> = positions.iter().map(|p| p.contract.name()).collect();
        assert_eq!(
            names,
            [
                "BTC-27MAR20",
                "BTC-27MAR20-7000-C",
                "BTC-27MAR20-9000-C",
                "BTC-26JUN20",
                "BTC-26JUN20-8000-P",
            ]
        );
    }
}
