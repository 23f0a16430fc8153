//! Backtest command implementation.
//!
//! Loads a `BacktestConfig`, replays the configured data file through the
//! simulator with the configured strategy and reports trade statistics.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::{Instrument, info, warn};

use bean_backtest::{Backtest, PortfolioStats, TradeStats, strategies};
use bean_core::config::{BacktestConfig, ConfigLoader};
use bean_core::ledger::Portfolio;
use bean_core::traits::{HistoricalDataProvider, Strategy};
use bean_data::sink::DEFAULT_FLUSH_INTERVAL;
use bean_data::{BatchingSink, JsonFileProvider, JsonLinesWriter, Point};
use bean_telemetry::spans::{backtest_span, command_span};

/// Arguments for the backtest command
#[derive(Args, Debug)]
pub struct BacktestArgs {
    /// Backtest configuration file (yaml, toml or json)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Output file path (optional)
    #[arg(long)]
    pub output_file: Option<PathBuf>,

    /// Also write order book statistics points as JSON lines to this file
    #[arg(long)]
    pub book_stats: Option<PathBuf>,
}

/// Result rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty JSON
    Json,
    /// Boxed table
    Table,
    /// `metric,value` rows
    Csv,
}

/// Run a backtest with the given arguments.
pub async fn run(args: BacktestArgs) -> Result<()> {
    execute(args).instrument(command_span("backtest")).await
}

async fn execute(args: BacktestArgs) -> Result<()> {
    let config: BacktestConfig = ConfigLoader::new()
        .load_file(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;
    config.validate().context("Invalid backtest configuration")?;

    let provider = JsonFileProvider::open(&config.data_file)
        .with_context(|| format!("Failed to load data file {}", config.data_file.display()))?;

    let mut strategy = strategies::from_config(&config).context("Invalid strategy parameters")?;
    let portfolio = Portfolio::with_balances(config.initial_balances.clone());

    let stats = {
        let _run = backtest_span(
            strategy.name(),
            &config.exchange,
            &config.start.to_rfc3339(),
            &config.end.to_rfc3339(),
        )
        .entered();

        let result = Backtest::new(&provider, config.depth)
            .simulate(strategy.as_mut(), config.start, config.end, &portfolio)
            .context("Backtest failed")?;
        let rates = result
            .reference_rates(&provider, config.mtm_base)
            .context("Failed to load reference rates")?;
        TradeStats::new(result.transactions, &portfolio, config.mtm_base, rates).summary()
    };

    if let Some(path) = &args.book_stats {
        let written = write_book_stats(&provider, &config, path.clone()).await?;
        info!(points = written, path = %path.display(), "Order book statistics written");
    }

    let output = render(&stats, args.output)?;
    if let Some(path) = &args.output_file {
        std::fs::write(path, &output)
            .with_context(|| format!("Failed to write output file {}", path.display()))?;
        info!(path = %path.display(), "Results written");
    } else {
        println!("{output}");
    }

    info!("Backtest completed");
    Ok(())
}

async fn write_book_stats(
    provider: &JsonFileProvider,
    config: &BacktestConfig,
    path: PathBuf,
) -> Result<usize> {
    let sink = BatchingSink::start(JsonLinesWriter::new(path), DEFAULT_FLUSH_INTERVAL);
    let mut written = 0;
    for &pair in &config.pairs {
        let series = provider
            .order_book_series(pair, config.start, config.end, config.depth)
            .with_context(|| format!("Failed to load order books for {pair}"))?;
        for snapshot in series.snapshots() {
            match Point::order_book_stats(snapshot.timestamp, &config.exchange, pair, &snapshot.book) {
                Some(point) => {
                    sink.push(point)?;
                    written += 1;
                }
                None => warn!(pair = %pair, time = %snapshot.timestamp, "Skipping invalid order book"),
            }
        }
    }
    sink.shutdown().await.context("Failed to flush order book statistics")?;
    Ok(written)
}

fn render(stats: &PortfolioStats, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(stats)?,
        OutputFormat::Table => stats_to_table(stats),
        OutputFormat::Csv => stats_to_csv(stats),
    })
}

fn metrics(stats: &PortfolioStats) -> Vec<(&'static str, String)> {
    let coins: Vec<String> = stats.all_coins.iter().map(ToString::to_string).collect();
    vec![
        ("mtm_base", stats.mtm_base.to_string()),
        ("coins", coins.join(" ")),
        ("transactions", stats.num_transactions.to_string()),
        ("total_amount", format!("{:.6}", stats.total_transaction_amount)),
        ("net_pnl", format!("{:.6}", stats.net_pnl)),
        ("average_pnl", format!("{:.6}", stats.average_pnl)),
        ("ann_return", format!("{:.6}", stats.ann_return)),
        ("max_drawdown", format!("{:.6}", stats.max_drawdown)),
        ("sharpe", format!("{:.4}", stats.sharpe)),
        ("avg_win_loss", format!("{:.4}", stats.win_loss.avg_win_loss)),
        ("win_rate", format!("{:.4}", stats.win_loss.win_rate)),
        ("loss_rate", format!("{:.4}", stats.win_loss.loss_rate)),
        ("wins_per_loss", format!("{:.4}", stats.win_loss.wins_per_loss)),
    ]
}

fn stats_to_table(stats: &PortfolioStats) -> String {
    let rule = "═".repeat(62);
    let mut lines = vec![
        format!("╔{rule}╗"),
        format!("║{:^62}║", "BACKTEST RESULTS"),
        format!("╠{rule}╣"),
    ];
    lines.extend(
        metrics(stats)
            .into_iter()
            .map(|(name, value)| format!("║ {name:<20}{value:>40} ║")),
    );
    for coin in &stats.coins {
        lines.push(format!("╠{rule}╣"));
        lines.push(format!(
            "║ {:<20}{:>40} ║",
            coin.coin.to_string(),
            format!("{} trades", coin.num_trades)
        ));
        lines.push(format!("║ {:<20}{:>40.6} ║", "  net_pnl", coin.net_pnl));
        lines.push(format!("║ {:<20}{:>40.6} ║", "  max_drawdown", coin.max_drawdown));
    }
    lines.push(format!("╚{rule}╝"));
    lines.join("\n")
}

fn stats_to_csv(stats: &PortfolioStats) -> String {
    let mut csv = String::from("metric,value\n");
    for (name, value) in metrics(stats) {
        csv.push_str(&format!("{name},{value}\n"));
    }
    for coin in &stats.coins {
        csv.push_str(&format!("{}_trades,{}\n", coin.coin, coin.num_trades));
        csv.push_str(&format!("{}_net_pnl,{}\n", coin.coin, coin.net_pnl));
        csv.push_str(&format!("{}_max_drawdown,{}\n", coin.coin, coin.max_drawdown));
    }
    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use bean_core::data::Transactions;
    use bean_core::types::Coin;

    fn create_stats() -> PortfolioStats {
        TradeStats::new(
            Transactions::default(),
            &Portfolio::with_balances([(Coin::Usdt, 100.0)]),
            Coin::Usdt,
            bean_backtest::ReferenceRateBook::new(),
        )
        .summary()
    }

    #[test]
    fn test_render_csv() {
        let csv = render(&create_stats(), OutputFormat::Csv).unwrap();
        assert!(csv.starts_with("metric,value\n"));
        assert!(csv.contains("mtm_base,USDT\n"));
        assert!(csv.contains("transactions,0\n"));
    }

    #[test]
    fn test_render_table_lines_align() {
        let table = render(&create_stats(), OutputFormat::Table).unwrap();
        let widths: Vec<usize> = table.lines().map(|l| l.chars().count()).collect();
        assert!(widths.iter().all(|&w| w == widths[0]));
        assert!(table.contains("BACKTEST RESULTS"));
    }

    #[test]
    fn test_render_json() {
        let json = render(&create_stats(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["mtm_base"], "USDT");
    }
}
