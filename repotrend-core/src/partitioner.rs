//! Key partitioning for routing events between parallel aggregator workers.
//!
//! Partitioning by key is total: every event for a given repository lands on
//! the same worker, so each key's window state has a single writer and no
//! cross-key synchronization is needed.

use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use ahash::AHasher;

/// Trait for partitioning data across parallel instances.
pub trait Partitioner<T>: Send + Sync {
    /// Determine which partition (0..num_partitions) this value should go to.
    fn partition(&self, value: &T, num_partitions: usize) -> usize;
}

/// Hash-based partitioner using a key selector function.
pub struct HashPartitioner<K, F> {
    key_selector: F,
    _phantom: PhantomData<K>,
}

impl<K, F> HashPartitioner<K, F> {
    /// Create a new hash partitioner with the given key selector.
    pub fn new(key_selector: F) -> Self {
        Self {
            key_selector,
            _phantom: PhantomData,
        }
    }
}

impl<K, T, F> Partitioner<T> for HashPartitioner<K, F>
where
    K: Hash + Send + Sync,
    F: Fn(&T) -> K + Send + Sync,
{
    fn partition(&self, value: &T, num_partitions: usize) -> usize {
        let key = (self.key_selector)(value);
        let mut hasher = AHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % num_partitions
    }
}
