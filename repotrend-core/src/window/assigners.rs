use super::*;

// ── Tumbling ──────────────────────────────────────────────────────────────────

/// Fixed-size, non-overlapping processing-time windows aligned to multiples
/// of `size`.
#[derive(Clone)]
pub struct TumblingProcessingTimeWindows {
    size_ms: i64,
}

impl TumblingProcessingTimeWindows {
    /// Create tumbling windows of the given `size`.
    pub fn of(size: Duration) -> Self {
        Self {
            size_ms: size.as_millis() as i64,
        }
    }

    /// The window size in milliseconds.
    pub fn size_ms(&self) -> i64 {
        self.size_ms
    }
}

impl WindowAssigner for TumblingProcessingTimeWindows {
    fn assign_windows(&self, timestamp: EventTime) -> Vec<TimeWindow> {
        let start = timestamp - timestamp.rem_euclid(self.size_ms);
        vec![TimeWindow::new(start, start + self.size_ms)]
    }
}

// ── Sliding ───────────────────────────────────────────────────────────────────

/// Fixed-size, overlapping processing-time windows.
///
/// Window starts are aligned to multiples of `slide`, so an element handled
/// at time `t` belongs to every window `[start, start + size)` with
/// `start = floor(t/slide)*slide - i*slide` for `i = 0 .. size/slide - 1`.
/// With `size` an integer multiple of `slide` that is always exactly
/// `size / slide` windows.
#[derive(Clone)]
pub struct SlidingProcessingTimeWindows {
    size_ms: i64,
    slide_ms: i64,
}

impl SlidingProcessingTimeWindows {
    /// Create sliding windows of the given `size` advancing every `slide`.
    pub fn of(size: Duration, slide: Duration) -> Self {
        Self {
            size_ms: size.as_millis() as i64,
            slide_ms: slide.as_millis() as i64,
        }
    }

    /// The window size in milliseconds.
    pub fn size_ms(&self) -> i64 {
        self.size_ms
    }

    /// The slide interval in milliseconds.
    pub fn slide_ms(&self) -> i64 {
        self.slide_ms
    }
}

impl WindowAssigner for SlidingProcessingTimeWindows {
    fn assign_windows(&self, timestamp: EventTime) -> Vec<TimeWindow> {
        // Walk back from the last aligned start by slide until no window
        // covers the timestamp.
        let last_start = timestamp - timestamp.rem_euclid(self.slide_ms);
        let mut windows = Vec::new();
        let mut start = last_start;
        while start > timestamp - self.size_ms {
            windows.push(TimeWindow::new(start, start + self.size_ms));
            start -= self.slide_ms;
        }
        windows
    }
}
