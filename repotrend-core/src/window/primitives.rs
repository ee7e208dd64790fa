use super::*;

/// A half-open processing-time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TimeWindow {
    pub start: EventTime,
    pub end: EventTime,
}

impl TimeWindow {
    pub fn new(start: EventTime, end: EventTime) -> Self {
        Self { start, end }
    }

    /// Return true if `timestamp` falls inside this window.
    pub fn contains(&self, timestamp: EventTime) -> bool {
        timestamp >= self.start && timestamp < self.end
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TimeWindow([{}, {}))", self.start, self.end)
    }
}

/// Assigns one or more [`TimeWindow`]s to a stream element based on the
/// processing clock at the moment it is handled.
///
/// The two assigners used by the pipeline:
/// - [`SlidingProcessingTimeWindows`] — fixed-size, overlapping; drives the
///   per-key count aggregation
/// - [`TumblingProcessingTimeWindows`] — fixed-size, non-overlapping; drives
///   the snapshot periods of the top-K stage
pub trait WindowAssigner: Send + Sync {
    /// Return the windows that contain the given timestamp.
    fn assign_windows(&self, timestamp: EventTime) -> Vec<TimeWindow>;
}
