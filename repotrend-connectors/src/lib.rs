//! # repotrend-connectors
//!
//! Edge adapters for the repotrend pipeline:
//!
//! - [`kafka`] — consumes repository activity events from a Kafka topic and
//!   feeds the pipeline's input channel.
//! - [`sink`] — flattens ranked snapshots into rows and writes them in
//!   batched, retried batches through a [`sink::RowWriter`].
//! - [`postgres`] — the production `RowWriter` backed by sqlx.
//! - [`retry`] — the bounded retry policy the sink writes with.

pub mod kafka;
pub mod postgres;
pub mod retry;
pub mod sink;
