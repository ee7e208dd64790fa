//! # repotrend-core
//!
//! Windowed aggregation and top-K ranking engine for repository activity
//! streams.
//!
//! This crate provides the pipeline's computation stages and the threaded
//! runtime that connects them:
//!
//! - [`types`] — stream units and domain records: [`RepoEvent`](types::RepoEvent),
//!   [`AggregateRecord`](types::AggregateRecord),
//!   [`TrendingSnapshot`](types::TrendingSnapshot).
//! - [`window`] — sliding processing-time window assignment, triggers, and the
//!   keyed count aggregation operator.
//! - [`topk`] — per-partition period collection and the global candidate merge.
//! - [`pipeline`] — router / worker / merge threads wired by bounded channels.
//! - [`channel`], [`partitioner`], [`time`], [`config`] — supporting pieces.
//!
//! I/O lives elsewhere: sources and sinks plug into the channels returned by
//! [`pipeline::start`].

pub mod channel;
pub mod config;
pub mod partitioner;
pub mod pipeline;
pub mod time;
pub mod topk;
pub mod types;
pub mod window;
