//! Trade statistics over an evaluated backtest.

use bean_core::data::Transactions;
use bean_core::ledger::Portfolio;
use bean_core::types::{Coin, Pair};
use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::BacktestError;
use crate::evaluate::{
    PerformanceSeries, ReferenceRateBook, Snapshot, Snapshots, drawdowns, evaluate_snapshot,
    evaluate_snapshots, lookup_rate, max_dd,
};

/// Annual risk-free rate subtracted in the Sharpe ratio.
pub const RISK_FREE_RATE: f64 = 0.02;

const DAYS_PER_YEAR: f64 = 365.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Shift applied to every value of a series that starts at zero.
const ZERO_START_OFFSET: f64 = 2e-8;

/// Win and loss counts over successive value changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WinLoss {
    /// Average gain over average loss magnitude
    pub avg_win_loss: f64,
    /// Winning changes per observation
    pub win_rate: f64,
    /// Losing changes per observation
    pub loss_rate: f64,
    /// Winning changes per losing change
    pub wins_per_loss: f64,
}

impl WinLoss {
    fn from_values(values: &[f64], observations: usize) -> Self {
        let (mut wins, mut losses) = (0.0, 0.0);
        let (mut win_amount, mut loss_amount) = (0.0, 0.0);
        for w in values.windows(2) {
            let change = w[1] - w[0];
            if change > 0.0 {
                wins += 1.0;
                win_amount += change;
            } else if change < 0.0 {
                losses += 1.0;
                loss_amount -= change;
            }
        }
        let observations = observations as f64;
        Self {
            avg_win_loss: (win_amount / wins) / (loss_amount / losses),
            win_rate: wins / observations,
            loss_rate: losses / observations,
            wins_per_loss: wins / losses,
        }
    }
}

/// Portfolio-level summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStats {
    /// Settlement coin
    pub mtm_base: Coin,
    /// Coins touched by the tape
    pub all_coins: Vec<Coin>,
    /// Number of fills
    pub num_transactions: usize,
    /// Sum of point-to-point P&L
    pub net_pnl: f64,
    /// Net P&L per performance point
    pub average_pnl: f64,
    /// Annualised log return
    pub ann_return: f64,
    /// Drawdown per performance point
    pub drawdown: Vec<f64>,
    /// Largest drawdown
    pub max_drawdown: f64,
    /// Annualised Sharpe ratio
    pub sharpe: f64,
    /// Win/loss breakdown
    pub win_loss: WinLoss,
    /// Sum of absolute fill amounts
    pub total_transaction_amount: f64,
    /// Per-coin breakdown
    pub coins: Vec<CoinStats>,
}

/// Per-coin summary.
///
/// The coin's value series only covers snapshots where its balance is
/// non-zero. Drawdowns are relative to the running peak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinStats {
    /// Summarised coin
    pub coin: Coin,
    /// Fills on pairs containing the coin
    pub num_trades: usize,
    /// Last value less first value
    pub net_pnl: f64,
    /// Net P&L per trade
    pub average_pnl: f64,
    /// Annualised log return
    pub ann_return: f64,
    /// Relative drawdown per point
    pub drawdown: Vec<f64>,
    /// Largest relative drawdown
    pub max_drawdown: f64,
    /// Annualised Sharpe ratio
    pub sharpe: f64,
    /// Win/loss breakdown, rates per trade
    pub win_loss: WinLoss,
}

/// Portfolio values sampled on a fixed grid of intervals.
///
/// Point `i` is the portfolio holding every fill before
/// `inception + i * interval`, valued at that time. The grid starts at the
/// first fill truncated to the interval and its last point holds every fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalPerformance {
    /// First grid point
    pub inception: DateTime<Utc>,
    /// Grid spacing in seconds
    pub interval_secs: i64,
    /// Settlement coin
    pub mtm_base: Coin,
    /// Portfolio at each grid point
    pub portfolios: Vec<Portfolio>,
    /// Value of each portfolio in `mtm_base`
    pub values: Vec<f64>,
}

impl IntervalPerformance {
    /// Replays `transactions` over `initial` on an `interval` grid.
    ///
    /// An empty tape gives an empty grid anchored at the Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns [`BacktestError::InvalidConfig`] when `interval` is not
    /// positive or the grid cannot be anchored.
    pub fn generate(
        transactions: &Transactions,
        initial: &Portfolio,
        interval: Duration,
        mtm_base: Coin,
        rates: &ReferenceRateBook,
    ) -> Result<Self, BacktestError> {
        if interval <= Duration::zero() {
            return Err(BacktestError::InvalidConfig(format!(
                "interval must be positive, got {interval}"
            )));
        }
        let tape = transactions.clone().sorted();
        let Some(first) = tape.iter().next() else {
            return Ok(Self {
                inception: DateTime::<Utc>::UNIX_EPOCH,
                interval_secs: interval.num_seconds(),
                mtm_base,
                portfolios: Vec::new(),
                values: Vec::new(),
            });
        };
        let inception = first
            .timestamp
            .duration_trunc(interval)
            .map_err(|e| {
                BacktestError::InvalidConfig(format!("cannot anchor interval grid: {e}"))
            })?;

        let mut portfolios = vec![initial.clone()];
        let mut portfolio = initial.clone();
        let mut next = inception + interval;
        for txn in &tape {
            while txn.timestamp >= next {
                portfolios.push(portfolio.clone());
                next += interval;
            }
            portfolio.apply_fill(txn.pair, txn.price, txn.amount);
        }
        portfolios.push(portfolio);

        let values = portfolios
            .iter()
            .zip(0..)
            .map(|(p, i)| {
                let snapshot = Snapshot {
                    time: inception + interval * i,
                    portfolio: p.clone(),
                };
                evaluate_snapshot(&snapshot, mtm_base, rates).pv
            })
            .collect();

        Ok(Self {
            inception,
            interval_secs: interval.num_seconds(),
            mtm_base,
            portfolios,
            values,
        })
    }

    /// Change in value over each interval.
    #[must_use]
    pub fn pnl(&self) -> Vec<f64> {
        self.values.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Mean interval P&L over its standard deviation, scaled to a year.
    ///
    /// `NaN` with fewer than two intervals.
    #[must_use]
    pub fn sharpe(&self) -> f64 {
        let pnl = self.pnl();
        if pnl.len() < 2 {
            return f64::NAN;
        }
        let periods_per_year = DAYS_PER_YEAR * SECONDS_PER_DAY / self.interval_secs as f64;
        pnl.iter().mean() / pnl.iter().std_dev() * periods_per_year.sqrt()
    }

    /// Largest fall in value from a running peak.
    #[must_use]
    pub fn max_drawdown(&self) -> f64 {
        max_dd(&self.values)
    }
}

/// Statistics over a fill tape valued in `mtm_base`.
#[derive(Debug, Clone)]
pub struct TradeStats {
    mtm_base: Coin,
    transactions: Transactions,
    snapshots: Snapshots,
    performance: PerformanceSeries,
    rates: ReferenceRateBook,
}

impl TradeStats {
    /// Replays `transactions` over `initial` and values every snapshot.
    #[must_use]
    pub fn new(
        transactions: Transactions,
        initial: &Portfolio,
        mtm_base: Coin,
        rates: ReferenceRateBook,
    ) -> Self {
        let transactions = transactions.sorted();
        let snapshots = Snapshots::generate(&transactions, initial);
        let performance = evaluate_snapshots(&snapshots, mtm_base, &rates);
        Self {
            mtm_base,
            transactions,
            snapshots,
            performance,
            rates,
        }
    }

    /// The valued series.
    #[must_use]
    pub const fn performance(&self) -> &PerformanceSeries {
        &self.performance
    }

    /// Distinct coins of the traded pairs, coin before base, first seen first.
    #[must_use]
    pub fn all_coins(&self) -> Vec<Coin> {
        let mut coins = Vec::new();
        for txn in &self.transactions {
            for coin in [txn.pair.coin, txn.pair.base] {
                if !coins.contains(&coin) {
                    coins.push(coin);
                }
            }
        }
        coins
    }

    /// Sum of the point-to-point P&L.
    #[must_use]
    pub fn net_pnl(&self) -> f64 {
        self.performance.iter().map(|p| p.pnl).sum()
    }

    /// Net P&L per performance point; zero with no points.
    #[must_use]
    pub fn average_pnl(&self) -> f64 {
        if self.performance.is_empty() {
            return 0.0;
        }
        self.net_pnl() / self.performance.len() as f64
    }

    /// Log returns between successive values.
    ///
    /// A series starting at zero is shifted by a tiny offset first, and
    /// changes across or below zero are signed by the direction of travel.
    #[must_use]
    pub fn returns(&self) -> Vec<f64> {
        let pvs = self.performance.pvs();
        if pvs.first() == Some(&0.0) {
            zero_start_returns(&pvs)
        } else {
            log_returns(&pvs)
        }
    }

    /// Summed log returns over the elapsed fraction of a year.
    #[must_use]
    pub fn ann_return(&self) -> f64 {
        annualise(&self.returns(), self.time_span())
    }

    /// Drawdown series and its maximum.
    #[must_use]
    pub fn max_drawdown(&self) -> (Vec<f64>, f64) {
        let series = drawdowns(&self.performance.pvs());
        let max = series.iter().copied().fold(0.0, f64::max);
        (series, max)
    }

    /// `(ann_return - 0.02) / (std(returns) * sqrt(365))`.
    #[must_use]
    pub fn sharpe(&self) -> f64 {
        let returns = self.returns();
        sharpe_ratio(&returns, annualise(&returns, self.time_span()))
    }

    /// Win/loss breakdown of value changes, rates per performance point.
    #[must_use]
    pub fn wl_ratio(&self) -> WinLoss {
        WinLoss::from_values(&self.performance.pvs(), self.performance.len())
    }

    /// The fills replayed on an `interval` grid, valued with this book.
    ///
    /// # Errors
    ///
    /// Same conditions as [`IntervalPerformance::generate`].
    pub fn interval_performance(
        &self,
        interval: Duration,
    ) -> Result<IntervalPerformance, BacktestError> {
        let initial = self
            .snapshots
            .iter()
            .next()
            .map_or_else(Portfolio::new, |s| s.portfolio.clone());
        IntervalPerformance::generate(
            &self.transactions,
            &initial,
            interval,
            self.mtm_base,
            &self.rates,
        )
    }

    /// Sum of absolute fill amounts.
    #[must_use]
    pub fn total_transaction_amount(&self) -> f64 {
        self.transactions.iter().map(|t| t.amount.abs()).sum()
    }

    /// Fills on pairs that contain `coin`.
    #[must_use]
    pub fn num_trades(&self, coin: Coin) -> usize {
        self.transactions
            .iter()
            .filter(|t| t.pair.coin == coin || t.pair.base == coin)
            .count()
    }

    /// Value of the `coin` balance at every snapshot holding some.
    #[must_use]
    pub fn coin_values(&self, coin: Coin) -> Vec<(DateTime<Utc>, f64)> {
        self.snapshots
            .iter()
            .filter_map(|s| {
                let balance = s.portfolio.balance(coin);
                if balance == 0.0 {
                    return None;
                }
                let rate = if coin == self.mtm_base {
                    1.0
                } else {
                    lookup_rate(Pair::new(coin, self.mtm_base), s.time, &self.rates)
                        .unwrap_or(f64::NAN)
                };
                Some((s.time, rate * balance))
            })
            .collect()
    }

    /// Statistics of one coin.
    #[must_use]
    pub fn coin_stats(&self, coin: Coin) -> CoinStats {
        let series = self.coin_values(coin);
        let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
        let num_trades = self.num_trades(coin);

        let net_pnl = match (values.first(), values.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        };
        let average_pnl = if num_trades == 0 {
            0.0
        } else {
            net_pnl / num_trades as f64
        };
        let span = match (series.first(), series.last()) {
            (Some((first, _)), Some((last, _))) => Some((*first, *last)),
            _ => None,
        };
        let returns = log_returns(&values);
        let ann_return = annualise(&returns, span);
        let drawdown = relative_drawdowns(&values);
        let max_drawdown = drawdown.iter().copied().fold(0.0, f64::max);

        CoinStats {
            coin,
            num_trades,
            net_pnl,
            average_pnl,
            ann_return,
            drawdown,
            max_drawdown,
            sharpe: sharpe_ratio(&returns, ann_return),
            win_loss: WinLoss::from_values(&values, num_trades),
        }
    }

    /// Everything above in one value.
    #[must_use]
    pub fn summary(&self) -> PortfolioStats {
        let all_coins = self.all_coins();
        let (drawdown, max_drawdown) = self.max_drawdown();
        PortfolioStats {
            mtm_base: self.mtm_base,
            num_transactions: self.transactions.len(),
            net_pnl: self.net_pnl(),
            average_pnl: self.average_pnl(),
            ann_return: self.ann_return(),
            drawdown,
            max_drawdown,
            sharpe: self.sharpe(),
            win_loss: self.wl_ratio(),
            total_transaction_amount: self.total_transaction_amount(),
            coins: all_coins.iter().map(|&c| self.coin_stats(c)).collect(),
            all_coins,
        }
    }

    fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.performance.iter().next()?;
        let last = self.performance.iter().last()?;
        Some((first.time, last.time))
    }
}

fn log_returns(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

fn zero_start_returns(values: &[f64]) -> Vec<f64> {
    let shifted: Vec<f64> = values.iter().map(|v| v + ZERO_START_OFFSET).collect();
    shifted
        .windows(2)
        .map(|w| {
            let (prev, cur) = (w[0], w[1]);
            if prev * cur > 0.0 {
                let r = (cur / prev).ln();
                if prev > 0.0 { r } else { -r }
            } else if prev > 0.0 {
                -((cur.abs() + 2.0 * prev) / prev).ln()
            } else {
                ((cur + 2.0 * prev.abs()) / prev.abs()).ln()
            }
        })
        .collect()
}

/// `NaN` when the span is empty or zero.
fn annualise(returns: &[f64], span: Option<(DateTime<Utc>, DateTime<Utc>)>) -> f64 {
    let Some((first, last)) = span else {
        return f64::NAN;
    };
    let days = (last - first).num_milliseconds() as f64 / 86_400_000.0;
    if days <= 0.0 {
        return f64::NAN;
    }
    returns.iter().sum::<f64>() / (days / DAYS_PER_YEAR)
}

fn sharpe_ratio(returns: &[f64], ann_return: f64) -> f64 {
    let vol = returns.iter().std_dev() * DAYS_PER_YEAR.sqrt();
    (ann_return - RISK_FREE_RATE) / vol
}

fn relative_drawdowns(values: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    values
        .iter()
        .map(|&v| {
            if v > peak {
                peak = v;
            }
            1.0 - v / peak
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::ReferenceRate;
    use bean_core::data::Transaction;
    use chrono::{Duration, TimeZone};

    fn create_time(days: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000, 0).unwrap() + Duration::days(days)
    }

    fn create_pair() -> Pair {
        Pair::new(Coin::Btc, Coin::Usdt)
    }

    fn create_rates() -> ReferenceRateBook {
        let rates = [(0, 100.0), (1, 100.0), (2, 120.0), (3, 90.0), (4, 130.0)]
            .into_iter()
            .map(|(d, price)| ReferenceRate {
                time: create_time(d),
                price,
            })
            .collect();
        ReferenceRateBook::from([(create_pair(), rates)])
    }

    fn create_stats() -> TradeStats {
        let tape = Transactions::new(vec![
            Transaction::new(create_pair(), 100.0, 1.0, create_time(1), "a"),
            Transaction::new(create_pair(), 120.0, 0.5, create_time(2), "b"),
            Transaction::new(create_pair(), 90.0, -0.5, create_time(3), "c"),
            Transaction::new(create_pair(), 130.0, -0.5, create_time(4), "d"),
        ]);
        let initial = Portfolio::with_balances([(Coin::Usdt, 1000.0)]);
        TradeStats::new(tape, &initial, Coin::Usdt, create_rates())
    }

    #[test]
    fn test_all_coins_and_counts() {
        let stats = create_stats();
        assert_eq!(stats.all_coins(), vec![Coin::Btc, Coin::Usdt]);
        assert_eq!(stats.num_trades(Coin::Btc), 4);
        assert_eq!(stats.num_trades(Coin::Eth), 0);
        assert!((stats.total_transaction_amount() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_net_pnl_matches_value_change() {
        let stats = create_stats();
        let pvs = stats.performance().pvs();
        assert!((pvs[0] - 1000.0).abs() < 1e-9);
        assert!((stats.net_pnl() - (pvs[pvs.len() - 1] - pvs[0])).abs() < 1e-9);
        assert!((stats.average_pnl() - stats.net_pnl() / pvs.len() as f64).abs() < 1e-12);
    }

    #[test]
    fn test_drawdown_and_wins() {
        let stats = create_stats();
        // 1000, 1000, 1020, 975, 1015
        let (series, max) = stats.max_drawdown();
        assert_eq!(series.len(), 5);
        assert!((max - 45.0).abs() < 1e-9);

        let wl = stats.wl_ratio();
        assert!((wl.win_rate - 2.0 / 5.0).abs() < 1e-12);
        assert!((wl.loss_rate - 1.0 / 5.0).abs() < 1e-12);
        assert!((wl.wins_per_loss - 2.0).abs() < 1e-12);
        assert!((wl.avg_win_loss - 30.0 / 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_ann_return_and_sharpe() {
        let stats = create_stats();
        let returns = stats.returns();
        assert_eq!(returns.len(), 4);
        // first snapshot sits one second before the first fill
        let days = 3.0 + 1.0 / 86_400.0;
        let expected = (1015.0_f64 / 1000.0).ln() / (days / 365.0);
        assert!((stats.ann_return() - expected).abs() < 1e-9);
        assert!(stats.sharpe().is_finite());
    }

    #[test]
    fn test_interval_performance_daily() {
        let stats = create_stats();
        let perf = stats.interval_performance(Duration::days(1)).unwrap();
        // fills land at 12:26:40, so each midnight sees the previous day's fills
        let inception = Utc.with_ymd_and_hms(2020, 9, 14, 0, 0, 0).unwrap();
        assert_eq!(perf.inception, inception);
        assert_eq!(perf.interval_secs, 86_400);
        assert_eq!(perf.portfolios.len(), 5);
        assert!((perf.portfolios[2].balance(Coin::Btc) - 1.5).abs() < 1e-12);

        let expected = [1000.0, 1000.0, 1020.0, 975.0, 1015.0];
        for (value, want) in perf.values.iter().zip(expected) {
            assert!((value - want).abs() < 1e-9, "{value} != {want}");
        }
        assert!((perf.max_drawdown() - 45.0).abs() < 1e-9);

        // interval P&L 0, 20, -45, 40
        let std = (3968.75_f64 / 3.0).sqrt();
        let sharpe = 3.75 / std * 365.0_f64.sqrt();
        assert!((perf.sharpe() - sharpe).abs() < 1e-9);
    }

    #[test]
    fn test_interval_performance_skips_quiet_intervals() {
        let tape = Transactions::new(vec![
            Transaction::new(create_pair(), 100.0, 1.0, create_time(1), "a"),
            Transaction::new(create_pair(), 130.0, -1.0, create_time(4), "b"),
        ]);
        let initial = Portfolio::with_balances([(Coin::Usdt, 1000.0)]);
        let perf = IntervalPerformance::generate(
            &tape,
            &initial,
            Duration::days(1),
            Coin::Usdt,
            &create_rates(),
        )
        .unwrap();
        // three empty midnights between the fills still get a point each
        assert_eq!(perf.portfolios.len(), 5);
        assert_eq!(perf.portfolios[1], perf.portfolios[3]);
        assert!((perf.values[4] - 1030.0).abs() < 1e-9);
    }

    #[test]
    fn test_interval_performance_edges() {
        let stats = create_stats();
        assert!(matches!(
            stats.interval_performance(Duration::zero()),
            Err(BacktestError::InvalidConfig(_))
        ));
        let empty = IntervalPerformance::generate(
            &Transactions::default(),
            &Portfolio::new(),
            Duration::hours(1),
            Coin::Usdt,
            &ReferenceRateBook::new(),
        )
        .unwrap();
        assert!(empty.values.is_empty());
        assert!(empty.sharpe().is_nan());
        assert_eq!(empty.max_drawdown(), 0.0);
    }

    #[test]
    fn test_zero_start_returns_signed() {
        let returns = zero_start_returns(&[0.0, 10.0, 5.0, -5.0, -10.0, -5.0]);
        assert!(returns[0] > 0.0);
        assert!(returns[1] < 0.0);
        assert!(returns[2] < 0.0);
        assert!(returns[3] < 0.0);
        assert!(returns[4] > 0.0);
    }

    #[test]
    fn test_coin_stats() {
        let stats = create_stats();
        let btc = stats.coin_stats(Coin::Btc);
        // balances 1, 1.5, 1, 0.5 valued at 100, 120, 90, 130
        assert_eq!(btc.num_trades, 4);
        assert!((btc.net_pnl - (65.0 - 100.0)).abs() < 1e-9);
        assert!((btc.average_pnl - btc.net_pnl / 4.0).abs() < 1e-12);
        assert!((btc.max_drawdown - (1.0 - 65.0 / 180.0)).abs() < 1e-9);
        assert!((btc.win_loss.win_rate - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_empty_tape() {
        let stats = TradeStats::new(
            Transactions::default(),
            &Portfolio::new(),
            Coin::Usdt,
            ReferenceRateBook::new(),
        );
        let summary = stats.summary();
        assert_eq!(summary.net_pnl, 0.0);
        assert_eq!(summary.average_pnl, 0.0);
        assert_eq!(summary.max_drawdown, 0.0);
        assert!(summary.ann_return.is_nan());
        assert!(summary.coins.is_empty());
    }

    #[test]
    fn test_summary_serializes() {
        let summary = create_stats().summary();
        assert_eq!(summary.coins.len(), 2);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["mtm_base"], "USDT");
        assert_eq!(json["num_transactions"], 4);
    }
}
