use super::*;

// ── WindowAggregator ──────────────────────────────────────────────────────────

/// Keyed sliding-window aggregation operator.
///
/// # Processing model
///
/// - **Elements**: keyed by `key_fn`, stamped with the processing clock at
///   the moment they are handled, and folded into the accumulator of every
///   overlapping window. Accumulators are created lazily on the first
///   element of a `(key, window)` pair and only ever grow until the window
///   closes.
/// - **Ticks**: a close timer is registered at each window's end
///   (idempotent re-registration); every processing-time tick drains the
///   timers that have come due, consults the trigger, and emits one
///   [`WindowResult`] per fired window, discarding its accumulator.
///
/// There is no watermarking and no late-data path: an element is always
/// assigned against the clock it was processed with, so by construction it
/// never maps into an already-closed window. Accumulator updates are
/// in-memory and unconditional; nothing here retries.
pub struct WindowAggregator<K, T, KF, TR, AGG, ACC, OUT>
where
    K: StreamData + Hash + Eq,
    KF: Fn(&T) -> K + Send,
    TR: Trigger<T>,
    AGG: AggregateFunction<T, ACC, OUT>,
    ACC: Clone,
{
    key_fn: KF,
    assigner: SlidingProcessingTimeWindows,
    trigger: TR,
    aggregate: AGG,
    /// Live accumulators: (key_bytes, window) -> (original key, accumulator).
    /// key_bytes is used as the HashMap key for O(1) lookup; the original
    /// key is kept alongside to avoid deserialization on emission.
    accumulators: HashMap<(Vec<u8>, TimeWindow), (K, ACC)>,
    /// Close timers, keyed by the serialized (key_bytes, window) pair.
    timer_service: TimerService,
    _phantom: PhantomData<(T, OUT)>,
}

/// The terminal value of one fired window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowResult<K, OUT> {
    pub key: K,
    pub window: TimeWindow,
    pub value: OUT,
}

impl<K, T, KF, TR, AGG, ACC, OUT> WindowAggregator<K, T, KF, TR, AGG, ACC, OUT>
where
    K: StreamData + Hash + Eq,
    KF: Fn(&T) -> K + Send,
    TR: Trigger<T>,
    AGG: AggregateFunction<T, ACC, OUT>,
    ACC: Clone,
{
    /// Create a new `WindowAggregator`.
    ///
    /// - `key_fn`: extracts the grouping key from each element
    /// - `assigner`: assigns the overlapping sliding windows
    /// - `trigger`: controls when windows fire/purge
    /// - `aggregate`: incremental per-window aggregation
    pub fn new(key_fn: KF, assigner: SlidingProcessingTimeWindows, trigger: TR, aggregate: AGG) -> Self {
        Self {
            key_fn,
            assigner,
            trigger,
            aggregate,
            accumulators: HashMap::new(),
            timer_service: TimerService::new(),
            _phantom: PhantomData,
        }
    }

    /// Process one element against the processing clock `now`.
    ///
    /// Folds the element into every window containing `now` and returns any
    /// results an eagerly-firing trigger produced (the default
    /// [`ProcessingTimeTrigger`] never fires here).
    pub fn process(&mut self, element: &T, now: EventTime) -> Result<Vec<WindowResult<K, OUT>>> {
        let key = (self.key_fn)(element);
        let key_bytes = bincode::serialize(&key)?;

        let mut output = Vec::new();
        for window in self.assigner.assign_windows(now) {
            let map_key = (key_bytes.clone(), window);

            let aggregate = &self.aggregate;
            let (_, acc) = self
                .accumulators
                .entry(map_key.clone())
                .or_insert_with(|| (key.clone(), aggregate.create_accumulator()));
            aggregate.add(acc, element);

            // Close timer at window end; re-registration is idempotent.
            let timer_key = bincode::serialize(&map_key)?;
            self.timer_service.register(timer_key, window.end);

            let trigger_result = self.trigger.on_element(element, now, &window);
            self.apply_trigger_result(map_key, trigger_result, &mut output)?;
        }
        Ok(output)
    }

    /// Advance the processing clock to `now`, firing every window whose
    /// close timer has come due.
    ///
    /// Results are emitted in ascending window-end order; each closed
    /// window's accumulator is removed from live state.
    pub fn on_processing_time(&mut self, now: EventTime) -> Result<Vec<WindowResult<K, OUT>>> {
        let mut trigger_results: Vec<((Vec<u8>, TimeWindow), TriggerResult)> = Vec::new();
        for (timer_key, _fire_at) in self.timer_service.drain_due(now) {
            let map_key: (Vec<u8>, TimeWindow) = bincode::deserialize(&timer_key)?;
            let result = self.trigger.on_processing_time(now, &map_key.1);
            trigger_results.push((map_key, result));
        }

        let mut output = Vec::new();
        for (map_key, trigger_result) in trigger_results {
            self.apply_trigger_result(map_key, trigger_result, &mut output)?;
        }
        Ok(output)
    }

    fn apply_trigger_result(
        &mut self,
        map_key: (Vec<u8>, TimeWindow),
        trigger_result: TriggerResult,
        output: &mut Vec<WindowResult<K, OUT>>,
    ) -> Result<()> {
        if trigger_result.is_fire() {
            if let Some((key, acc)) = self.accumulators.remove(&map_key) {
                if trigger_result.is_purge() {
                    self.delete_close_timer(&map_key)?;
                    output.push(WindowResult {
                        key,
                        window: map_key.1,
                        value: self.aggregate.get_result(acc),
                    });
                } else {
                    output.push(WindowResult {
                        key: key.clone(),
                        window: map_key.1,
                        value: self.aggregate.get_result(acc.clone()),
                    });
                    self.accumulators.insert(map_key, (key, acc));
                }
            }
            return Ok(());
        }

        if trigger_result.is_purge() {
            self.accumulators.remove(&map_key);
            self.delete_close_timer(&map_key)?;
        }
        Ok(())
    }

    fn delete_close_timer(&mut self, map_key: &(Vec<u8>, TimeWindow)) -> Result<()> {
        let timer_key = bincode::serialize(map_key)?;
        self.timer_service.delete(&timer_key, map_key.1.end);
        Ok(())
    }

    /// Return the total number of live (key, window) accumulators.
    pub fn live_accumulator_count(&self) -> usize {
        self.accumulators.len()
    }

    /// Return the number of windows currently live for the given key.
    pub fn live_windows_for_key(&self, key: &K) -> Result<usize> {
        let key_bytes = bincode::serialize(key)?;
        Ok(self
            .accumulators
            .keys()
            .filter(|(kb, _)| *kb == key_bytes)
            .count())
    }
}
