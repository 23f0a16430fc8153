//! Backtest run configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::types::{Coin, Pair};

/// Everything needed to replay one strategy over a recorded window.
///
/// # Examples
///
/// ```
/// use bean_core::config::{BacktestConfig, ConfigFormat, ConfigLoader};
///
/// let yaml = r#"
/// pairs: ["BTC/USDT"]
/// start: 2020-01-01T00:00:00Z
/// end: 2020-01-02T00:00:00Z
/// data_file: data.json
/// initial_balances: { USDT: 10000.0 }
/// "#;
/// let config: BacktestConfig = ConfigLoader::new().load_str(yaml, ConfigFormat::Yaml).unwrap();
/// assert!(config.validate().is_ok());
/// assert_eq!(config.tick_secs, 60);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Name the simulated exchange answers to.
    #[serde(default = "default_exchange")]
    pub exchange: String,

    /// Pairs to load and trade.
    pub pairs: Vec<Pair>,

    /// First simulated instant.
    pub start: DateTime<Utc>,

    /// Simulation stops before this instant.
    pub end: DateTime<Utc>,

    /// Seconds between strategy decisions.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Order book levels loaded per side.
    #[serde(default = "default_depth")]
    pub depth: usize,

    /// Starting balances.
    #[serde(default)]
    pub initial_balances: BTreeMap<Coin, f64>,

    /// Coin the results are marked in.
    #[serde(default = "default_mtm_base")]
    pub mtm_base: Coin,

    /// JSON dataset with order books and transactions.
    pub data_file: PathBuf,

    /// Strategy to run.
    #[serde(default)]
    pub strategy: StrategyConfig,
}

/// Strategy selection and parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// Symmetric quotes around mid.
    SimpleMm {
        /// Fractional distance of each quote from mid.
        #[serde(default = "default_spread")]
        spread: f64,
        /// Quote size in coin units.
        #[serde(default = "default_amount")]
        amount: f64,
    },
    /// Quotes biased by deep-book pressure and by the held position.
    StackBiasMm {
        /// Quote size in coin units.
        #[serde(default = "default_trading_amount")]
        trading_amount: f64,
        /// Position at which the position bias is at full strength.
        #[serde(default = "default_max_position")]
        max_position: f64,
        /// Weight of the deep-book price relative to the quoted mid.
        #[serde(default = "default_bias_factor")]
        large_bias_factor: f64,
        /// Spreads the mid moves per full `max_position`.
        #[serde(default = "default_bias_factor")]
        position_bias_factor: f64,
    },
    /// Steps in ahead of large orders that have rested for several ticks.
    OrderScan {
        /// Order size in coin units.
        #[serde(default = "default_trading_amount")]
        trading_amount: f64,
    },
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::SimpleMm {
            spread: default_spread(),
            amount: default_amount(),
        }
    }
}

fn default_exchange() -> String {
    "sim".to_string()
}

const fn default_tick_secs() -> u64 {
    60
}

const fn default_depth() -> usize {
    20
}

const fn default_mtm_base() -> Coin {
    Coin::Usdt
}

const fn default_spread() -> f64 {
    0.001
}

const fn default_amount() -> f64 {
    1000.0
}

const fn default_trading_amount() -> f64 {
    1.0
}

const fn default_max_position() -> f64 {
    10.0
}

const fn default_bias_factor() -> f64 {
    0.5
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid_value(field, "must be positive"))
    }
}

fn unit_interval(field: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid_value(field, "must be in [0, 1]"))
    }
}

impl BacktestConfig {
    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start >= self.end {
            return Err(ConfigError::invalid_value("end", "must be after start"));
        }
        if self.tick_secs == 0 {
            return Err(ConfigError::invalid_value("tick_secs", "must be positive"));
        }
        if self.pairs.is_empty() {
            return Err(ConfigError::invalid_value("pairs", "at least one pair is required"));
        }
        if self.depth == 0 {
            return Err(ConfigError::invalid_value("depth", "must be positive"));
        }
        match self.strategy {
            StrategyConfig::SimpleMm { spread, amount } => {
                if !(spread.is_finite() && spread >= 0.0 && spread < 1.0) {
                    return Err(ConfigError::invalid_value("strategy.spread", "must be in [0, 1)"));
                }
                positive("strategy.amount", amount)?;
            }
            StrategyConfig::StackBiasMm {
                trading_amount,
                max_position,
                large_bias_factor,
                position_bias_factor,
            } => {
                positive("strategy.trading_amount", trading_amount)?;
                positive("strategy.max_position", max_position)?;
                unit_interval("strategy.large_bias_factor", large_bias_factor)?;
                unit_interval("strategy.position_bias_factor", position_bias_factor)?;
            }
            StrategyConfig::OrderScan { trading_amount } => {
                positive("strategy.trading_amount", trading_amount)?;
            }
        }
        Ok(())
    }

    /// Tick as a duration.
    #[must_use]
    pub fn tick(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.tick_secs).unwrap_or(i64::MAX))
    }
}
