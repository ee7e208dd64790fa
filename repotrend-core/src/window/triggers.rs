use super::*;

// ── Trigger ───────────────────────────────────────────────────────────────────

/// The result returned by a [`Trigger`] to control window evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerResult {
    /// Keep accumulating elements; do not fire the window yet.
    Continue,
    /// Evaluate the window and emit its result; keep the window state.
    Fire,
    /// Discard window state without emitting any result.
    Purge,
    /// Evaluate the window, emit its result, then discard state.
    FireAndPurge,
}

impl TriggerResult {
    /// Return true if the window result should be emitted.
    pub fn is_fire(self) -> bool {
        matches!(self, TriggerResult::Fire | TriggerResult::FireAndPurge)
    }

    /// Return true if the window state should be discarded after this result.
    pub fn is_purge(self) -> bool {
        matches!(self, TriggerResult::Purge | TriggerResult::FireAndPurge)
    }
}

/// Determines when a window is evaluated (fired) and when its state is
/// discarded (purged).
///
/// Called by [`WindowAggregator`] on two paths:
/// - when an element arrives (`on_element`)
/// - when the processing clock ticks past a registered close time
///   (`on_processing_time`)
pub trait Trigger<T>: Send {
    /// Called for every element assigned to a window.
    fn on_element(&mut self, element: &T, timestamp: EventTime, window: &TimeWindow)
        -> TriggerResult;

    /// Called when the processing clock advances past a window's close timer.
    fn on_processing_time(&mut self, now: EventTime, window: &TimeWindow) -> TriggerResult;
}

// ── ProcessingTimeTrigger ─────────────────────────────────────────────────────

/// The default trigger for processing-time windowing.
///
/// Fires and purges as soon as the clock reaches the window end: a window
/// `[start, end)` is complete once `now >= end`, because no later element can
/// be assigned into it.
#[derive(Clone, Copy, Default)]
pub struct ProcessingTimeTrigger;

impl<T: Send> Trigger<T> for ProcessingTimeTrigger {
    fn on_element(&mut self, _element: &T, _timestamp: EventTime, _window: &TimeWindow)
        -> TriggerResult {
        // No per-element action needed; the close timer drives firing.
        TriggerResult::Continue
    }

    fn on_processing_time(&mut self, now: EventTime, window: &TimeWindow) -> TriggerResult {
        if now >= window.end {
            TriggerResult::FireAndPurge
        } else {
            TriggerResult::Continue
        }
    }
}
