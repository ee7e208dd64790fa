//! Threaded pipeline runtime.
//!
//! Wires the stages into a dataflow of dedicated threads connected by
//! bounded channels:
//!
//! ```text
//! events ─▶ router ─▶ worker 0..N-1 ─▶ merge ─▶ snapshots
//!           (hash by repo)   (windows + local top-K)
//! ```
//!
//! - The router hash-partitions events by repository name, so each key's
//!   window state has exactly one writer.
//! - Worker loops poll their input with a timeout: a received record is
//!   processed against the wall clock, and every iteration also runs the
//!   processing-time tick that closes due windows and flushes completed
//!   snapshot periods.
//! - The merge stage combines the per-partition candidates and emits one
//!   snapshot per non-empty period, once every worker has reported it.
//! - `End` flows through every stage; in-flight window and period state is
//!   deliberately dropped on shutdown (there is no checkpointing, so a
//!   restart starts from empty state).
//!
//! All channels are bounded, so a slow consumer blocks its producers and the
//! pressure propagates upstream to the source instead of dropping data.

use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use tracing::{debug, info};

use crate::channel::{local_channel, LocalChannelReceiver, LocalChannelSender};
use crate::config::PipelineConfig;
use crate::partitioner::{HashPartitioner, Partitioner};
use crate::time::current_processing_time_ms;
use crate::topk::{LocalTopK, TopKMerge};
use crate::types::{
    AggregateRecord, CandidateSet, RepoEvent, StreamElement, TrendingSnapshot,
};
use crate::window::{
    CountAggregate, ProcessingTimeTrigger, SlidingProcessingTimeWindows, WindowAggregator,
};

/// Join handles for a running pipeline.
pub struct PipelineHandles {
    handles: Vec<JoinHandle<Result<()>>>,
}

impl PipelineHandles {
    /// Wait for every stage thread and surface the first failure.
    pub fn join(self) -> Result<()> {
        let mut first_err = None;
        for handle in self.handles {
            let name = handle.thread().name().unwrap_or("pipeline").to_string();
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    first_err.get_or_insert(e.context(format!("stage '{name}' failed")));
                }
                Err(_) => {
                    first_err.get_or_insert(anyhow!("stage '{name}' panicked"));
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Start the pipeline threads.
///
/// Returns the event input, the snapshot output, and the stage handles.
/// Sending [`StreamElement::End`] into the input shuts the stages down in
/// order; the snapshot receiver yields `End` last.
pub fn start(
    config: PipelineConfig,
) -> Result<(
    LocalChannelSender<RepoEvent>,
    LocalChannelReceiver<TrendingSnapshot>,
    PipelineHandles,
)> {
    config.validate()?;

    let parallelism = config.parallelism;
    let capacity = config.channel_capacity;

    let (events_tx, events_rx) = local_channel::<RepoEvent>(capacity);
    let (merge_tx, merge_rx) = local_channel::<CandidateSet>(capacity);
    let (snapshots_tx, snapshots_rx) = local_channel::<TrendingSnapshot>(capacity);

    let mut worker_txs = Vec::with_capacity(parallelism);
    let mut worker_rxs = Vec::with_capacity(parallelism);
    for _ in 0..parallelism {
        let (tx, rx) = local_channel::<RepoEvent>(capacity);
        worker_txs.push(tx);
        worker_rxs.push(rx);
    }

    let mut handles = Vec::with_capacity(parallelism + 2);

    // ── Router ────────────────────────────────────────────────────────────────
    handles.push(
        thread::Builder::new()
            .name("repotrend-router".to_string())
            .spawn(move || -> Result<()> {
                let partitioner = HashPartitioner::new(|e: &RepoEvent| e.repo.clone());
                loop {
                    match events_rx.recv()? {
                        StreamElement::Record(rec) => {
                            let target = partitioner.partition(&rec.value, parallelism);
                            worker_txs[target].send(StreamElement::Record(rec))?;
                        }
                        StreamElement::End => {
                            for tx in &worker_txs {
                                tx.send(StreamElement::End)?;
                            }
                            break;
                        }
                    }
                }
                Ok(())
            })?,
    );

    // ── Aggregator workers ────────────────────────────────────────────────────
    for (index, receiver) in worker_rxs.into_iter().enumerate() {
        let merge_tx = merge_tx.clone();
        let config = config.clone();
        handles.push(
            thread::Builder::new()
                .name(format!("repotrend-worker-{index}"))
                .spawn(move || -> Result<()> {
                    run_worker(index, &config, receiver, merge_tx)
                })?,
        );
    }
    drop(merge_tx);

    // ── Merge ─────────────────────────────────────────────────────────────────
    handles.push(
        thread::Builder::new()
            .name("repotrend-merge".to_string())
            .spawn(move || -> Result<()> {
                let mut merge = TopKMerge::new(config.top_k, parallelism);
                let mut ended = 0;
                loop {
                    match merge_rx.recv()? {
                        StreamElement::Record(rec) => {
                            if let Some(snapshot) = merge.merge(rec.value) {
                                info!(
                                    period_end = snapshot.period_end,
                                    entries = snapshot.entries.len(),
                                    "period ranked"
                                );
                                snapshots_tx.send(StreamElement::record(snapshot))?;
                            }
                        }
                        StreamElement::End => {
                            ended += 1;
                            if ended == parallelism {
                                snapshots_tx.send(StreamElement::End)?;
                                break;
                            }
                        }
                    }
                }
                Ok(())
            })?,
    );

    Ok((events_tx, snapshots_rx, PipelineHandles { handles }))
}

/// One key-partitioned aggregation worker.
///
/// Owns the sliding-window state and the local top-K working set for its
/// share of the key space. Every loop iteration reads the wall clock once,
/// flushes completed periods, closes due windows, and only then folds in the
/// received record, so records and window results always land in the period
/// containing the clock that produced them.
fn run_worker(
    index: usize,
    config: &PipelineConfig,
    receiver: LocalChannelReceiver<RepoEvent>,
    merge_tx: LocalChannelSender<CandidateSet>,
) -> Result<()> {
    let mut aggregator = WindowAggregator::new(
        |e: &RepoEvent| e.repo.clone(),
        SlidingProcessingTimeWindows::of(config.window_length, config.slide_interval),
        ProcessingTimeTrigger,
        CountAggregate::new(),
    );
    let mut local = LocalTopK::new(config.snapshot_period, config.top_k);

    loop {
        let element = receiver.recv_timeout(config.tick_interval)?;
        let now = current_processing_time_ms();

        for set in local.advance(now) {
            merge_tx.send(StreamElement::record(set))?;
        }

        for result in aggregator.on_processing_time(now)? {
            let record = AggregateRecord {
                repo: result.key,
                window_end: result.window.end,
                count: result.value,
            };
            debug!(worker = index, %record, "window closed");
            local.observe(record);
        }

        match element {
            Some(StreamElement::Record(rec)) => {
                for result in aggregator.process(&rec.value, now)? {
                    local.observe(AggregateRecord {
                        repo: result.key,
                        window_end: result.window.end,
                        count: result.value,
                    });
                }
            }
            Some(StreamElement::End) => {
                debug!(
                    worker = index,
                    dropped_windows = aggregator.live_accumulator_count(),
                    dropped_records = local.working_set_len(),
                    "worker ending; in-flight state dropped"
                );
                merge_tx.send(StreamElement::End)?;
                break;
            }
            None => {}
        }
    }
    Ok(())
}
