//! Span definitions for the bean tools.
//!
//! - CLI command execution
//! - Backtest runs
//! - Contract pricing

use tracing::{Span, info_span};

/// Create a span for one CLI command.
///
/// # Example
///
/// ```
/// use bean_telemetry::spans::command_span;
///
/// let span = command_span("backtest");
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn command_span(command: &str) -> Span {
    info_span!("command", command = %command)
}

/// Create a span for a backtest run.
#[must_use]
pub fn backtest_span(strategy: &str, exchange: &str, start: &str, end: &str) -> Span {
    info_span!(
        "backtest",
        strategy.name = %strategy,
        exchange = %exchange,
        start = %start,
        end = %end
    )
}

/// Create a span for pricing one contract.
#[must_use]
pub fn pricing_span(contract: &str) -> Span {
    info_span!("pricing", contract = %contract)
}
