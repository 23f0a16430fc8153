//! Asset identifiers.
//!
//! # Types
//!
//! - [`Coin`] - A tradeable asset symbol
//! - [`Pair`] - A spot trading pair, `coin` priced in `base`

mod coin;
mod pair;

pub use coin::Coin;
pub use pair::{Pair, all_coins, right_pair};
