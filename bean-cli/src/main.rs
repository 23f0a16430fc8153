//! # Bean CLI
//!
//! Command-line interface for the bean backtester and option pricer.
//!
//! This CLI provides commands for:
//! - Backtesting the built-in market maker on recorded data
//! - Black-76 pricing, implied vol and Greeks
//! - Parsing and normalising contract names

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use bean_telemetry::logging::{LogConfig, LogFormat, init_logging};
use commands::{backtest, contract, price};

/// Bean - order book backtesting and option pricing
#[derive(Parser)]
#[command(name = "bean")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log format
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Pretty)]
    log_format: LogFormatArg,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a backtest described by a config file
    Backtest(backtest::BacktestArgs),

    /// Price an option and its Greeks
    Price(price::PriceArgs),

    /// Parse contract names
    Contract(contract::ContractArgs),
}

/// Log format flag values
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    /// JSON lines
    Json,
    /// Human-readable
    Pretty,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Json => Self::Json,
            LogFormatArg::Pretty => Self::Pretty,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guards = init_logging(&LogConfig::for_verbosity(cli.verbose, cli.log_format.into()))?;

    match cli.command {
        Commands::Backtest(args) => backtest::run(args).await?,
        Commands::Price(args) => price::run(&args)?,
        Commands::Contract(args) => contract::run(&args)?,
    }

    Ok(())
}
