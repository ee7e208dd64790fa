use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// A single repository activity event.
///
/// Events carry no timestamp of their own: the pipeline runs on processing
/// time, so the aggregator's clock at the moment of processing decides which
/// windows the event falls into.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoEvent {
    /// Full repository name, e.g. `rust-lang/rust`. The partitioning key.
    pub repo: String,
}

impl RepoEvent {
    pub fn new(repo: impl Into<String>) -> Self {
        Self { repo: repo.into() }
    }
}

/// The terminal value of a closed window accumulator.
///
/// Emitted exactly once per `(repo, window)` pair, when the processing clock
/// reaches the window's end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregateRecord {
    pub repo: String,
    /// End of the window this count was accumulated over (exclusive).
    pub window_end: EventTime,
    pub count: u64,
}

impl std::fmt::Display for AggregateRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{} x{}", self.repo, self.window_end, self.count)
    }
}

/// One ranked entry: a repository and its window count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrendEntry {
    pub repo: String,
    pub count: u64,
}

impl TrendEntry {
    pub fn new(repo: impl Into<String>, count: u64) -> Self {
        Self {
            repo: repo.into(),
            count,
        }
    }
}

/// One partition's locally-ranked candidates for a single snapshot period.
///
/// Every partition reports exactly one `CandidateSet` per period, even when
/// it observed no closed windows (`entries` empty). The merge stage waits for
/// all partitions before ranking a period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateSet {
    /// End of the snapshot period these candidates were collected in.
    pub period_end: EventTime,
    /// At most K entries, stably sorted by count descending.
    pub entries: Vec<TrendEntry>,
}

/// The globally ranked result of one snapshot period.
///
/// At most K entries, sorted by count descending; entries with equal counts
/// keep the order in which their records were received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrendingSnapshot {
    pub period_end: EventTime,
    pub entries: Vec<TrendEntry>,
}

impl std::fmt::Display for TrendingSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "snapshot@{} ({} entries)", self.period_end, self.entries.len())
    }
}

/// A record in the stream, carrying user data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamRecord<T> {
    pub value: T,
}

impl<T> StreamRecord<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

/// The unit flowing through pipeline channels: data records plus the end
/// marker that propagates shutdown through every stage of a bounded run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StreamElement<T> {
    /// User data record.
    Record(StreamRecord<T>),
    /// End of bounded stream.
    End,
}

impl<T> StreamElement<T> {
    /// Create a record element.
    pub fn record(value: T) -> Self {
        Self::Record(StreamRecord::new(value))
    }
}

/// Trait bound for types that can flow through the stream.
pub trait StreamData: Send + Clone + Serialize + for<'de> Deserialize<'de> + 'static {}

// Blanket implementation: any type satisfying the bounds is StreamData.
impl<T> StreamData for T where T: Send + Clone + Serialize + for<'de> Deserialize<'de> + 'static {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_element_record() {
        let elem = StreamElement::record(RepoEvent::new("a/b"));
        match &elem {
            StreamElement::Record(rec) => assert_eq!(rec.value.repo, "a/b"),
            StreamElement::End => panic!("expected Record"),
        }
    }

    #[test]
    fn test_stream_data_trait() {
        // Verify pipeline types satisfy StreamData.
        fn assert_stream_data<T: StreamData>() {}
        assert_stream_data::<RepoEvent>();
        assert_stream_data::<AggregateRecord>();
        assert_stream_data::<CandidateSet>();
        assert_stream_data::<TrendingSnapshot>();
    }

    #[test]
    fn test_aggregate_record_display() {
        let rec = AggregateRecord {
            repo: "a/b".to_string(),
            window_end: 10_000,
            count: 3,
        };
        assert_eq!(rec.to_string(), "a/b@10000 x3");
    }
}
