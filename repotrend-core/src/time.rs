use std::collections::{BTreeMap, BTreeSet};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

/// Processing time in milliseconds since the Unix epoch.
pub type EventTime = i64;

/// Read the current processing time from the wall clock.
///
/// This is the only place the pipeline touches the system clock; operators
/// take the timestamp as a parameter so tests can inject their own clock.
pub fn current_processing_time_ms() -> EventTime {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as EventTime)
        .unwrap_or(0)
}

/// Manages processing-time timers for a single operator.
///
/// Timers are sorted by fire time in a `BTreeMap`, enabling O(log n) range
/// scans when a tick drains everything that has come due.
///
/// # Invariant
/// A `(key_bytes, fire_at)` pair is registered at most once; re-registering
/// the same pair is idempotent.
#[derive(Debug, Clone, Default)]
pub struct TimerService {
    /// Sorted map: fire_at -> set of serialized key bytes registered at that time.
    timers: BTreeMap<EventTime, BTreeSet<Vec<u8>>>,
}

impl TimerService {
    /// Create an empty `TimerService`.
    pub fn new() -> Self {
        Self {
            timers: BTreeMap::new(),
        }
    }

    /// Register a timer for `key_bytes` to fire at `fire_at`.
    ///
    /// Re-registering the same `(key_bytes, fire_at)` pair is idempotent.
    pub fn register(&mut self, key_bytes: Vec<u8>, fire_at: EventTime) {
        self.timers.entry(fire_at).or_default().insert(key_bytes);
    }

    /// Cancel a timer. No-op if the pair was not registered.
    pub fn delete(&mut self, key_bytes: &[u8], fire_at: EventTime) {
        if let Some(keys) = self.timers.get_mut(&fire_at) {
            keys.remove(key_bytes);
            if keys.is_empty() {
                self.timers.remove(&fire_at);
            }
        }
    }

    /// Drain and return all timers with `fire_at <= now`.
    ///
    /// The returned vector contains `(key_bytes, fire_at)` pairs in ascending
    /// `fire_at` order.
    pub fn drain_due(&mut self, now: EventTime) -> Vec<(Vec<u8>, EventTime)> {
        let fire_times: Vec<EventTime> = self.timers.range(..=now).map(|(ts, _)| *ts).collect();

        let mut fired = Vec::new();
        for fire_at in fire_times {
            if let Some(keys) = self.timers.remove(&fire_at) {
                for key in keys {
                    fired.push((key, fire_at));
                }
            }
        }
        fired
    }

    /// Fire all timers with `fire_at <= now`.
    ///
    /// Calls `callback(key_bytes, fire_at)` for each fired timer in ascending
    /// `fire_at` order. Fired timers are removed from the service.
    pub fn fire_timers(
        &mut self,
        now: EventTime,
        mut callback: impl FnMut(&[u8], EventTime) -> Result<()>,
    ) -> Result<()> {
        for (key, fire_at) in self.drain_due(now) {
            callback(&key, fire_at)?;
        }
        Ok(())
    }

    /// Return the timestamp of the earliest pending timer, or `None`.
    pub fn next_timer(&self) -> Option<EventTime> {
        self.timers.keys().next().copied()
    }

    /// Return the total count of registered `(key, fire_at)` pairs.
    pub fn len(&self) -> usize {
        self.timers.values().map(|keys| keys.len()).sum()
    }

    /// Return `true` if no timers are registered.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_register_and_fire() {
        let mut svc = TimerService::new();
        svc.register(b"key-a".to_vec(), 1_000);

        let mut fired: Vec<(Vec<u8>, EventTime)> = Vec::new();
        svc.fire_timers(1_000, |k, t| {
            fired.push((k.to_vec(), t));
            Ok(())
        })
        .unwrap();

        assert_eq!(fired, vec![(b"key-a".to_vec(), 1_000)]);
        assert!(svc.is_empty());
    }

    #[test]
    fn test_timer_does_not_fire_early() {
        let mut svc = TimerService::new();
        svc.register(b"key-a".to_vec(), 2_000);

        let fired = svc.drain_due(1_999);
        assert!(fired.is_empty(), "timer must not fire before its time");
        assert_eq!(svc.len(), 1);
    }

    #[test]
    fn test_timer_fires_in_ascending_order() {
        let mut svc = TimerService::new();
        svc.register(b"k".to_vec(), 3_000);
        svc.register(b"k".to_vec(), 1_000);
        svc.register(b"k".to_vec(), 2_000);

        let fire_times: Vec<EventTime> = svc.drain_due(3_000).into_iter().map(|(_, t)| t).collect();
        assert_eq!(fire_times, vec![1_000, 2_000, 3_000]);
        assert!(svc.is_empty());
    }

    #[test]
    fn test_timer_delete_cancels() {
        let mut svc = TimerService::new();
        svc.register(b"key-a".to_vec(), 1_000);
        svc.delete(b"key-a", 1_000);

        assert!(svc.drain_due(2_000).is_empty(), "deleted timer must not fire");
        assert!(svc.is_empty());
    }

    #[test]
    fn test_timer_register_idempotent() {
        let mut svc = TimerService::new();
        svc.register(b"key-a".to_vec(), 1_000);
        svc.register(b"key-a".to_vec(), 1_000); // duplicate
        assert_eq!(svc.len(), 1, "duplicate registration must be idempotent");

        let fired = svc.drain_due(1_000);
        assert_eq!(fired.len(), 1);
    }

    #[test]
    fn test_next_timer() {
        let mut svc = TimerService::new();
        assert_eq!(svc.next_timer(), None);
        svc.register(b"a".to_vec(), 5_000);
        svc.register(b"b".to_vec(), 2_000);
        assert_eq!(svc.next_timer(), Some(2_000));
    }
}
