//! Contract name parsing errors.

use thiserror::Error;

/// Errors raised while parsing a contract name such as `BTC-29MAR19-3500-C`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// Name does not split into a known number of `-` separated parts.
    #[error("[Contract] bad contract formation: '{name}'")]
    BadFormation {
        /// Offending contract name.
        name: String,
    },

    /// Underlying coin has no derivative market.
    #[error("[Contract] do not recognise coin '{coin}'")]
    UnknownCoin {
        /// Coin part of the name.
        coin: String,
    },

    /// Date part is not `DMMMYY` or `DDMMMYY`.
    #[error("[Contract] date not recognised: '{date}'")]
    BadDate {
        /// Date part of the name.
        date: String,
    },

    /// Strike is not an integer.
    #[error("[Contract] strike not recognised: '{strike}'")]
    BadStrike {
        /// Strike part of the name.
        strike: String,
    },

    /// Option flag is not `C` or `P`.
    #[error("[Contract] need C or P, got '{flag}'")]
    BadCallPut {
        /// Flag part of the name.
        flag: String,
    },
}
