//! Derivative contracts.
//!
//! # Types
//!
//! - [`Contract`] - Future, option, perpetual or index instrument
//! - [`ContractCache`] - Injected name to contract cache
//! - [`Position`] - Quantity and entry price held in a contract

mod cache;
mod instrument;
mod position;

pub use cache::ContractCache;
pub use instrument::{
    CallPut, Contract, ContractKind, EXPIRY_HOUR, day_diff, expiry_on_date, format_expiry,
    parse_expiry,
};
pub use position::{Position, positions_from_names, sort_positions};
