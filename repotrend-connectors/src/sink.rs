//! Batched, retried delivery of ranked snapshots to the trend store.
//!
//! [`BatchingSink`] flattens each snapshot into one row per entry, buffers
//! rows until either the batch-size or the batch-time threshold is reached,
//! and writes each batch through a [`RowWriter`] with a bounded retry.
//! Exhausting the retries is fatal: the error propagates out of the sink
//! loop and tears the pipeline run down. A retried batch may resend rows the
//! store already applied; delivery is at-least-once by design.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::debug;

use repotrend_core::channel::LocalChannelReceiver;
use repotrend_core::types::{StreamElement, TrendingSnapshot};

use crate::retry::{with_retry, RetryPolicy};

/// One flattened sink row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendRow {
    pub repo: String,
    pub count: i64,
}

/// The relational-store boundary: durably applies one batch of rows.
///
/// Implementations own connection state and statement execution; the sink
/// only guarantees an ordered, flattened row stream and the retry envelope.
pub trait RowWriter: Send {
    fn write_rows(&mut self, rows: &[TrendRow]) -> Result<()>;
}

/// Batching thresholds and the retry budget for one sink.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Flush when this many rows are buffered.
    pub batch_size: usize,
    /// Flush any buffered rows once this much time has passed since the
    /// previous flush, whichever threshold is reached first.
    pub batch_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            batch_interval: Duration::from_millis(200),
            retry: RetryPolicy::fixed(5, Duration::from_millis(100)),
        }
    }
}

/// Buffers flattened rows and writes them in retried batches.
pub struct BatchingSink<W: RowWriter> {
    writer: W,
    config: BatchConfig,
    buffer: Vec<TrendRow>,
    last_flush: Instant,
}

impl<W: RowWriter> BatchingSink<W> {
    pub fn new(writer: W, config: BatchConfig) -> Self {
        Self {
            writer,
            config,
            buffer: Vec::new(),
            last_flush: Instant::now(),
        }
    }

    /// Flatten one snapshot into the row buffer, flushing whenever the size
    /// threshold is crossed.
    pub fn push_snapshot(&mut self, snapshot: TrendingSnapshot) -> Result<()> {
        for entry in snapshot.entries {
            self.buffer.push(TrendRow {
                repo: entry.repo,
                count: entry.count as i64,
            });
            if self.buffer.len() >= self.config.batch_size {
                self.flush()?;
            }
        }
        Ok(())
    }

    /// Flush if rows are buffered and the batch interval has elapsed.
    pub fn maybe_flush(&mut self) -> Result<()> {
        if !self.buffer.is_empty() && self.last_flush.elapsed() >= self.config.batch_interval {
            self.flush()?;
        }
        Ok(())
    }

    /// Write out everything buffered, retrying per the policy.
    ///
    /// Exhausting the retries returns the underlying error; the caller must
    /// treat it as fatal.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            self.last_flush = Instant::now();
            return Ok(());
        }
        let rows = std::mem::take(&mut self.buffer);
        let writer = &mut self.writer;
        with_retry(&self.config.retry, "batch write", || writer.write_rows(&rows))
            .context("sink retries exhausted")?;
        debug!(rows = rows.len(), "batch written");
        self.last_flush = Instant::now();
        Ok(())
    }

    /// Number of rows currently buffered.
    pub fn buffered_rows(&self) -> usize {
        self.buffer.len()
    }

    /// Consume the pipeline's snapshot stream until `End`.
    ///
    /// Timeouts on the channel drive the time-threshold flush; `End` flushes
    /// whatever is left and returns.
    pub fn run(mut self, snapshots: LocalChannelReceiver<TrendingSnapshot>) -> Result<()> {
        loop {
            match snapshots.recv_timeout(self.config.batch_interval)? {
                Some(StreamElement::Record(rec)) => {
                    self.push_snapshot(rec.value)?;
                    self.maybe_flush()?;
                }
                Some(StreamElement::End) => {
                    self.flush()?;
                    return Ok(());
                }
                None => self.maybe_flush()?,
            }
        }
    }
}
