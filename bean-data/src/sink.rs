//! Batching market-data sink.
//!
//! Producers enqueue [`Point`]s from any task; a background task drains the
//! buffer into a [`PointWriter`] on a fixed interval.

use async_trait::async_trait;
use bean_core::data::OrderBook;
use bean_core::types::Pair;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::DataProviderError;

/// Measurement name of order book statistics points.
pub const ORDER_BOOK_STATS: &str = "orderbook_stats";

/// Percentage bands recorded by [`Point::order_book_stats`].
pub const STATS_PCTS: [usize; 4] = [0, 1, 5, 10];

/// Multiples of the base trade size recorded as price-in-amount fields.
pub const PRICE_IN_MULTIPLES: [f64; 3] = [1.0, 5.0, 10.0];

/// Default flush period.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// A tagged measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Measurement name
    pub measurement: String,
    /// Indexed tags
    pub tags: BTreeMap<String, String>,
    /// Numeric fields
    pub fields: BTreeMap<String, f64>,
    /// Observation time
    pub timestamp: DateTime<Utc>,
}

impl Point {
    /// Creates a point with no tags or fields.
    #[must_use]
    pub fn new(measurement: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp,
        }
    }

    /// Adds a tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: f64) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Liquidity statistics of `book`, or `None` for an invalid book.
    ///
    /// Fields: `mid`, relative `spread`, `{bid,ask}_vwap_{p}` and
    /// `{bid,ask}_camt_{p}` for each band in [`STATS_PCTS`], and
    /// `{bid,ask}_pia_{price,amount}_{m}` for each multiple in
    /// [`PRICE_IN_MULTIPLES`] of [`base_trade_size`].
    #[must_use]
    pub fn order_book_stats(
        timestamp: DateTime<Utc>,
        exchange: &str,
        pair: Pair,
        book: &OrderBook,
    ) -> Option<Self> {
        if !book.is_valid() {
            return None;
        }
        let cum = book.cum_pct_order_book();
        let mut point = Self::new(ORDER_BOOK_STATS, timestamp)
            .tag("LHS", pair.coin.to_string())
            .tag("RHS", pair.base.to_string())
            .tag("exchange", exchange);

        for p in STATS_PCTS {
            if let Some(level) = cum.bids.get(p) {
                point = point
                    .field(format!("bid_vwap_{p}"), level.price)
                    .field(format!("bid_camt_{p}"), level.amount);
            }
            if let Some(level) = cum.asks.get(p) {
                point = point
                    .field(format!("ask_vwap_{p}"), level.price)
                    .field(format!("ask_camt_{p}"), level.amount);
            }
        }

        let (bid, ask) = (cum.bids[0].price, cum.asks[0].price);
        let mid = (bid + ask) / 2.0;
        point = point.field("mid", mid).field("spread", (ask - bid) / mid);

        let unit = base_trade_size(pair, mid);
        for multiple in PRICE_IN_MULTIPLES {
            let walk = book.price_in(unit * multiple);
            point = point
                .field(format!("bid_pia_price_{multiple}"), walk.bid.price)
                .field(format!("bid_pia_amount_{multiple}"), walk.bid.available)
                .field(format!("ask_pia_price_{multiple}"), walk.ask.price)
                .field(format!("ask_pia_amount_{multiple}"), walk.ask.available);
        }
        Some(point)
    }
}

/// Reference trade size in coin units: a fixed value in the base coin
/// converted at `mid`.
#[must_use]
pub fn base_trade_size(pair: Pair, mid: f64) -> f64 {
    use bean_core::types::Coin;
    let base_value = match pair.base {
        Coin::Btc => 0.1,
        Coin::Eth => 5.0,
        Coin::Usd | Coin::Usdt | Coin::Usdc | Coin::Pax | Coin::Tusd => 1000.0,
        _ => 0.0,
    };
    base_value / mid
}

/// Destination of flushed batches.
#[async_trait]
pub trait PointWriter: Send + Sync + 'static {
    /// Writes one batch. On error the sink keeps the batch for the next flush.
    async fn write_points(&self, points: &[Point]) -> Result<(), DataProviderError>;
}

/// Keeps every batch in memory.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    batches: Mutex<Vec<Vec<Point>>>,
}

impl MemoryWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches written so far.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<Point>> {
        self.batches.lock().clone()
    }

    /// All points written so far, in write order.
    #[must_use]
    pub fn points(&self) -> Vec<Point> {
        self.batches.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl PointWriter for MemoryWriter {
    async fn write_points(&self, points: &[Point]) -> Result<(), DataProviderError> {
        self.batches.lock().push(points.to_vec());
        Ok(())
    }
}

/// Appends each point as one JSON line to a file.
#[derive(Debug, Clone)]
pub struct JsonLinesWriter {
    path: PathBuf,
}

impl JsonLinesWriter {
    /// Writer appending to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PointWriter for JsonLinesWriter {
    async fn write_points(&self, points: &[Point]) -> Result<(), DataProviderError> {
        let mut buf = Vec::new();
        for point in points {
            serde_json::to_writer(&mut buf, point)?;
            buf.push(b'\n');
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&buf).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Buffers points and flushes them on a timer.
///
/// Must be started inside a tokio runtime. Call [`BatchingSink::shutdown`]
/// to stop the timer and write what is left.
pub struct BatchingSink<W: PointWriter> {
    buffer: Arc<Mutex<Vec<Point>>>,
    writer: Arc<W>,
    closed: AtomicBool,
    stop: Mutex<Option<oneshot::Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<W: PointWriter> BatchingSink<W> {
    /// Starts the flush task.
    #[must_use]
    pub fn start(writer: W, flush_interval: Duration) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let writer = Arc::new(writer);
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let task_buffer = Arc::clone(&buffer);
        let task_writer = Arc::clone(&writer);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(flush_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = drain(&task_buffer, task_writer.as_ref()).await {
                            warn!(error = %e, "Periodic flush failed");
                        }
                    }
                    _ = &mut stop_rx => break,
                }
            }
            debug!("Sink flush task stopped");
        });

        Self {
            buffer,
            writer,
            closed: AtomicBool::new(false),
            stop: Mutex::new(Some(stop_tx)),
            task: Mutex::new(Some(task)),
        }
    }

    /// Enqueues a point for the next flush.
    pub fn push(&self, point: Point) -> Result<(), DataProviderError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DataProviderError::Closed);
        }
        self.buffer.lock().push(point);
        Ok(())
    }

    /// Points waiting for the next flush.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Writes the buffer now.
    pub async fn flush(&self) -> Result<(), DataProviderError> {
        drain(&self.buffer, self.writer.as_ref()).await
    }

    /// Stops the timer and flushes the remaining points. Later pushes fail
    /// with [`DataProviderError::Closed`].
    pub async fn shutdown(&self) -> Result<(), DataProviderError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(stop) = self.stop.lock().take() {
            let _ = stop.send(());
        }
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Sink flush task ended abnormally");
            }
        }
        self.flush().await
    }

    /// The underlying writer.
    #[must_use]
    pub fn writer(&self) -> &W {
        &self.writer
    }
}

async fn drain<W: PointWriter>(
    buffer: &Mutex<Vec<Point>>,
    writer: &W,
) -> Result<(), DataProviderError> {
    let mut batch = std::mem::take(&mut *buffer.lock());
    if batch.is_empty() {
        return Ok(());
    }
    debug!(points = batch.len(), "Flushing points");
    if let Err(e) = writer.write_points(&batch).await {
        // requeue ahead of anything pushed during the write
        let mut pending = buffer.lock();
        batch.append(&mut pending);
        *pending = batch;
        return Err(e);
    }
    Ok(())
}
