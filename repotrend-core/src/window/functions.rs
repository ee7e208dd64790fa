use super::*;

// ── AggregateFunction ─────────────────────────────────────────────────────────

/// Incremental aggregation function.
///
/// The accumulator is updated on each incoming element, so only `O(1)` state
/// is kept per `(key, window)` pair instead of buffering the raw elements.
pub trait AggregateFunction<IN, ACC, OUT>: Send {
    /// Create a fresh accumulator for a new window.
    fn create_accumulator(&self) -> ACC;
    /// Fold one element into the accumulator.
    fn add(&self, acc: &mut ACC, element: &IN);
    /// Convert the final accumulator into the window result.
    fn get_result(&self, acc: ACC) -> OUT;
}

// ── CountAggregate ────────────────────────────────────────────────────────────

/// Counts the elements assigned to a window.
///
/// The accumulator is a plain integer, created at zero on the first matching
/// element and incremented by one per element; it never decreases while the
/// window is live.
#[derive(Clone, Copy, Default)]
pub struct CountAggregate;

impl CountAggregate {
    pub fn new() -> Self {
        Self
    }
}

impl<T> AggregateFunction<T, u64, u64> for CountAggregate {
    fn create_accumulator(&self) -> u64 {
        0
    }

    fn add(&self, acc: &mut u64, _element: &T) {
        *acc += 1;
    }

    fn get_result(&self, acc: u64) -> u64 {
        acc
    }
}
