//! Groups intermediate pairs by key between the map and reduce phases.

use dashmap::DashMap;
use itertools::Itertools;

use common::{ihash, KeyGroup, KeyValue};

type BucketIndex = u32;

/// The key groups routed to one reduce partition, ordered by key.
#[derive(Clone, Debug, Default)]
pub struct Partition {
    pub reduce_id: BucketIndex,
    pub groups: Vec<KeyGroup>,
}

impl Partition {
    /// Total number of values across every group.
    pub fn value_count(&self) -> u64 {
        self.groups.iter().map(|group| group.len() as u64).sum()
    }
}

/// Collects emissions from any number of map workers and hands them back
/// grouped by key.
///
/// Implementations must deliver every pushed value exactly once, with all
/// values for a key in a single group. The engine verifies this before
/// reducing and aborts the run if it does not hold.
pub trait Grouping: Sync {
    /// Accepts the emissions of one record.
    fn push(&self, emissions: Vec<KeyValue>);

    /// Consumes the grouping and returns its partitions, ordered by id.
    fn into_partitions(self) -> Vec<Partition>;
}

/// In-memory grouping that routes each key to `ihash(key) % n_reduce`.
pub struct HashGrouping {
    n_reduce: u32,
    buckets: DashMap<BucketIndex, Vec<KeyValue>>,
}

impl HashGrouping {
    pub fn new(n_reduce: u32) -> Self {
        HashGrouping {
            n_reduce: n_reduce.max(1),
            buckets: DashMap::new(),
        }
    }

    pub fn n_reduce(&self) -> u32 {
        self.n_reduce
    }

    pub fn bucket_of(&self, key: &[u8]) -> BucketIndex {
        ihash(key) % self.n_reduce
    }
}

impl Grouping for HashGrouping {
    fn push(&self, emissions: Vec<KeyValue>) {
        for kv in emissions {
            let bucket_no = self.bucket_of(&kv.key);
            self.buckets.entry(bucket_no).or_default().push(kv);
        }
    }

    fn into_partitions(self) -> Vec<Partition> {
        let mut partitions = self
            .buckets
            .into_iter()
            .map(|(reduce_id, mut bkt)| {
                bkt.sort_by_key(KeyValue::key);
                let groups = bkt
                    .into_iter()
                    .chunk_by(KeyValue::key)
                    .into_iter()
                    .map(|(key, group)| KeyGroup::new(key, group.map(KeyValue::into_value).collect()))
                    .collect();
                Partition { reduce_id, groups }
            })
            .collect::<Vec<_>>();

        partitions.sort_unstable_by_key(|p| p.reduce_id);
        partitions
    }
}
