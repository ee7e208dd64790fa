//! Periodic top-K extraction as a two-stage fan-in.
//!
//! Every partition worker runs a [`LocalTopK`]: it collects the aggregate
//! records its own windows emit during the current snapshot period and, when
//! the clock crosses the period boundary, flushes at most K locally-ranked
//! candidates. The single [`TopKMerge`] stage combines the candidate sets of
//! all partitions for a period (at most `partitions x K` entries) into the
//! final snapshot. Both stages share the same ranking contract: stable sort
//! by count descending, ties kept in the order received.

use std::collections::HashMap;
use std::time::Duration;

use crate::time::EventTime;
use crate::types::{AggregateRecord, CandidateSet, TrendEntry, TrendingSnapshot};
use crate::window::{TumblingProcessingTimeWindows, WindowAssigner};

/// Stable descending ranking.
///
/// Sorts by count descending keeping the incoming order for equal counts,
/// then truncates to the first `min(k, len)` entries. Pure: re-ranking an
/// unchanged input yields a bit-identical result.
pub fn rank_descending(mut entries: Vec<TrendEntry>, k: usize) -> Vec<TrendEntry> {
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(k);
    entries
}

// ── LocalTopK ─────────────────────────────────────────────────────────────────

/// Per-partition period collector.
///
/// Aggregate records observed while a snapshot period is open are appended to
/// the working set; duplicates for the same key from different windows stay
/// separate entries. Crossing the period boundary flushes the ranked
/// candidates and clears the working set.
///
/// Callers must [`advance`](Self::advance) the clock before
/// [`observe`](Self::observe)-ing records from the same instant, so a record
/// is always collected into the period containing the clock that emitted it.
pub struct LocalTopK {
    periods: TumblingProcessingTimeWindows,
    k: usize,
    /// End of the period currently collecting, established from the first
    /// clock observation.
    current_period_end: Option<EventTime>,
    working_set: Vec<TrendEntry>,
}

impl LocalTopK {
    pub fn new(period: Duration, k: usize) -> Self {
        Self {
            periods: TumblingProcessingTimeWindows::of(period),
            k,
            current_period_end: None,
            working_set: Vec::new(),
        }
    }

    /// Append one aggregate record to the current period's working set.
    pub fn observe(&mut self, record: AggregateRecord) {
        self.working_set.push(TrendEntry {
            repo: record.repo,
            count: record.count,
        });
    }

    /// Advance the clock, flushing every period that has ended.
    ///
    /// Returns one [`CandidateSet`] per completed period, empty sets
    /// included, so the merge stage can account for every partition each
    /// period. Under regular ticking this is at most one set; after a stall
    /// it covers the skipped periods too.
    pub fn advance(&mut self, now: EventTime) -> Vec<CandidateSet> {
        let period_ms = self.periods.size_ms();
        let current_end = match self.current_period_end {
            Some(end) => end,
            None => {
                // First observation of the clock: open the containing period.
                let end = self.periods.assign_windows(now)[0].end;
                self.current_period_end = Some(end);
                return Vec::new();
            }
        };

        let mut flushed = Vec::new();
        let mut end = current_end;
        while now >= end {
            let entries = rank_descending(std::mem::take(&mut self.working_set), self.k);
            flushed.push(CandidateSet {
                period_end: end,
                entries,
            });
            end += period_ms;
        }
        self.current_period_end = Some(end);
        flushed
    }

    /// Number of records collected in the open period.
    pub fn working_set_len(&self) -> usize {
        self.working_set.len()
    }
}

// ── TopKMerge ─────────────────────────────────────────────────────────────────

/// Single merge point for the partitioned candidate sets.
///
/// A period is ranked once every partition has reported it; entries are
/// concatenated in report order before the final stable sort, so the
/// tie-break contract ("first received wins") carries through the fan-in.
/// An all-empty period produces no snapshot.
pub struct TopKMerge {
    k: usize,
    num_partitions: usize,
    pending: HashMap<EventTime, PendingPeriod>,
}

#[derive(Default)]
struct PendingPeriod {
    reports: usize,
    entries: Vec<TrendEntry>,
}

impl TopKMerge {
    pub fn new(k: usize, num_partitions: usize) -> Self {
        Self {
            k,
            num_partitions,
            pending: HashMap::new(),
        }
    }

    /// Fold in one partition's candidates for a period.
    ///
    /// Returns the period's snapshot exactly once, when the last partition
    /// reports; `None` otherwise, and `None` for a period with no entries at
    /// all.
    pub fn merge(&mut self, set: CandidateSet) -> Option<TrendingSnapshot> {
        let period_end = set.period_end;
        let pending = self.pending.entry(period_end).or_default();
        pending.reports += 1;
        pending.entries.extend(set.entries);

        if pending.reports < self.num_partitions {
            return None;
        }

        let entries = self
            .pending
            .remove(&period_end)
            .map(|p| p.entries)
            .unwrap_or_default();
        if entries.is_empty() {
            return None;
        }
        Some(TrendingSnapshot {
            period_end,
            entries: rank_descending(entries, self.k),
        })
    }

    /// Number of periods still waiting for partition reports.
    pub fn pending_periods(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(repo: &str, window_end: EventTime, count: u64) -> AggregateRecord {
        AggregateRecord {
            repo: repo.to_string(),
            window_end,
            count,
        }
    }

    // ── rank_descending ───────────────────────────────────────────────────────

    #[test]
    fn test_rank_sorts_descending_and_truncates() {
        let entries = vec![
            TrendEntry::new("c", 3),
            TrendEntry::new("a", 9),
            TrendEntry::new("b", 5),
        ];
        let ranked = rank_descending(entries, 2);
        assert_eq!(ranked, vec![TrendEntry::new("a", 9), TrendEntry::new("b", 5)]);
    }

    #[test]
    fn test_rank_ties_keep_received_order() {
        // A received before B; C loses on count.
        let entries = vec![
            TrendEntry::new("A", 5),
            TrendEntry::new("B", 5),
            TrendEntry::new("C", 3),
        ];
        let ranked = rank_descending(entries, 2);
        assert_eq!(ranked, vec![TrendEntry::new("A", 5), TrendEntry::new("B", 5)]);
    }

    #[test]
    fn test_rank_is_idempotent() {
        let entries = vec![
            TrendEntry::new("x", 4),
            TrendEntry::new("y", 4),
            TrendEntry::new("z", 7),
        ];
        let once = rank_descending(entries.clone(), 10);
        let twice = rank_descending(once.clone(), 10);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rank_fewer_than_k_is_not_padded() {
        let entries = vec![TrendEntry::new("only", 1)];
        assert_eq!(rank_descending(entries, 10).len(), 1);
    }

    // ── LocalTopK ─────────────────────────────────────────────────────────────

    #[test]
    fn test_local_topk_flushes_on_period_boundary() {
        let mut local = LocalTopK::new(Duration::from_millis(100), 10);

        assert!(local.advance(10).is_empty(), "first call only opens the period");
        local.observe(record("a", 50, 3));
        local.observe(record("b", 50, 1));
        assert!(local.advance(99).is_empty(), "period [0, 100) still open");

        let flushed = local.advance(100);
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].period_end, 100);
        assert_eq!(
            flushed[0].entries,
            vec![TrendEntry::new("a", 3), TrendEntry::new("b", 1)]
        );
        assert_eq!(local.working_set_len(), 0, "working set cleared after flush");
    }

    #[test]
    fn test_local_topk_truncates_to_k() {
        let mut local = LocalTopK::new(Duration::from_millis(100), 2);
        local.advance(0);
        for (repo, count) in [("a", 1), ("b", 9), ("c", 5), ("d", 7)] {
            local.observe(record(repo, 100, count));
        }
        let flushed = local.advance(100);
        assert_eq!(
            flushed[0].entries,
            vec![TrendEntry::new("b", 9), TrendEntry::new("d", 7)]
        );
    }

    #[test]
    fn test_local_topk_duplicate_keys_stay_separate() {
        // The same repo closing two different windows in one period is two
        // working-set entries; no merging by key.
        let mut local = LocalTopK::new(Duration::from_millis(100), 10);
        local.advance(0);
        local.observe(record("a", 20, 2));
        local.observe(record("a", 40, 6));
        let flushed = local.advance(100);
        assert_eq!(
            flushed[0].entries,
            vec![TrendEntry::new("a", 6), TrendEntry::new("a", 2)]
        );
    }

    #[test]
    fn test_local_topk_empty_period_flushes_empty_set() {
        let mut local = LocalTopK::new(Duration::from_millis(100), 10);
        local.advance(0);
        let flushed = local.advance(105);
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].period_end, 100);
        assert!(flushed[0].entries.is_empty());
    }

    #[test]
    fn test_local_topk_stall_covers_skipped_periods() {
        let mut local = LocalTopK::new(Duration::from_millis(100), 10);
        local.advance(0);
        local.observe(record("a", 20, 1));

        // Clock jumps three periods ahead: the record belongs to the first.
        let flushed = local.advance(310);
        let ends: Vec<EventTime> = flushed.iter().map(|s| s.period_end).collect();
        assert_eq!(ends, vec![100, 200, 300]);
        assert_eq!(flushed[0].entries.len(), 1);
        assert!(flushed[1].entries.is_empty());
        assert!(flushed[2].entries.is_empty());
    }

    #[test]
    fn test_local_topk_periods_align_to_multiples() {
        let mut local = LocalTopK::new(Duration::from_millis(100), 10);
        // First clock observation mid-period: the open period is [200, 300).
        local.advance(250);
        let flushed = local.advance(300);
        assert_eq!(flushed[0].period_end, 300);
    }

    // ── TopKMerge ─────────────────────────────────────────────────────────────

    fn set(period_end: EventTime, entries: Vec<TrendEntry>) -> CandidateSet {
        CandidateSet {
            period_end,
            entries,
        }
    }

    #[test]
    fn test_merge_waits_for_all_partitions() {
        let mut merge = TopKMerge::new(10, 2);

        assert!(merge
            .merge(set(100, vec![TrendEntry::new("a", 2)]))
            .is_none());
        assert_eq!(merge.pending_periods(), 1);

        let snapshot = merge
            .merge(set(100, vec![TrendEntry::new("b", 5)]))
            .expect("second report completes the period");
        assert_eq!(snapshot.period_end, 100);
        assert_eq!(
            snapshot.entries,
            vec![TrendEntry::new("b", 5), TrendEntry::new("a", 2)]
        );
        assert_eq!(merge.pending_periods(), 0);
    }

    #[test]
    fn test_merge_tie_break_is_report_order() {
        let mut merge = TopKMerge::new(2, 2);

        // Partition reporting A first wins the tie against B; C is cut.
        assert!(merge
            .merge(set(100, vec![TrendEntry::new("A", 5), TrendEntry::new("C", 3)]))
            .is_none());
        let snapshot = merge
            .merge(set(100, vec![TrendEntry::new("B", 5)]))
            .unwrap();
        assert_eq!(
            snapshot.entries,
            vec![TrendEntry::new("A", 5), TrendEntry::new("B", 5)]
        );
    }

    #[test]
    fn test_merge_empty_period_yields_no_snapshot() {
        let mut merge = TopKMerge::new(10, 3);
        assert!(merge.merge(set(100, vec![])).is_none());
        assert!(merge.merge(set(100, vec![])).is_none());
        assert!(merge.merge(set(100, vec![])).is_none());
        assert_eq!(merge.pending_periods(), 0, "completed empty period is dropped");
    }

    #[test]
    fn test_merge_caps_at_k() {
        let mut merge = TopKMerge::new(2, 1);
        let snapshot = merge
            .merge(set(
                100,
                vec![
                    TrendEntry::new("a", 1),
                    TrendEntry::new("b", 3),
                    TrendEntry::new("c", 2),
                ],
            ))
            .unwrap();
        assert_eq!(snapshot.entries.len(), 2);
        assert_eq!(snapshot.entries[0], TrendEntry::new("b", 3));
    }

    #[test]
    fn test_merge_interleaved_periods() {
        let mut merge = TopKMerge::new(10, 2);

        assert!(merge.merge(set(100, vec![TrendEntry::new("a", 1)])).is_none());
        assert!(merge.merge(set(200, vec![TrendEntry::new("b", 2)])).is_none());
        assert_eq!(merge.pending_periods(), 2);

        let first = merge.merge(set(100, vec![])).unwrap();
        assert_eq!(first.period_end, 100);
        let second = merge.merge(set(200, vec![])).unwrap();
        assert_eq!(second.period_end, 200);
    }
}
