//! Shared types for the word-count MapReduce (lite) pipeline.
//!
//! Applications are written as a pair of plain functions: a map function
//! that turns one input record into zero or more intermediate key-value
//! pairs, and a reduce function that turns every value for one key into a
//! single output value. Execution, grouping and output are left to the
//! substrate that drives them (see the `standalone` crate).

use std::fmt;
use std::fmt::Formatter;
use std::hash::Hasher;

use bytes::Bytes;

pub mod codec;
pub mod error;
pub mod job;
pub mod utils;

pub use error::MapReduceError;

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// The output of an application map function.
///
/// There are 2 layers of [`anyhow::Result`]s here. The outer layer
/// accounts for errors that arise while creating the iterator.
/// The inner layer accounts for errors that occur during iteration.
///
/// This accommodates both batch (all keys emitted at once) and lazy
/// (keys only emitted when the iterator is consumed) map operations.
pub type MapOutput = anyhow::Result<Box<dyn Iterator<Item = anyhow::Result<KeyValue>>>>;

/// A map function takes a key-value pair and auxiliary arguments.
///
/// It returns an iterator that yields new key-value pairs.
pub type MapFn = fn(kv: KeyValue, aux: Bytes) -> MapOutput;

/// A reduce function takes in a key, an iterator over values for that key,
/// and an auxiliary argument. It returns an [`anyhow::Result`]
/// containing a single output value.
///
/// The substrate guarantees that `values` is the complete group for `key`,
/// and that the function is invoked at most once per key for a whole job.
pub type ReduceFn = fn(
    key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    aux: Bytes,
) -> anyhow::Result<Bytes>;

/// A map reduce application.
#[derive(Copy, Clone)]
pub struct Workload {
    pub map_fn: MapFn,
    pub reduce_fn: ReduceFn,
}

/////////////////////////////////////////////////////////////////////////////
// Key-value pairs
/////////////////////////////////////////////////////////////////////////////

/// A single key-value pair.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct KeyValue {
    /// The key.
    pub key: Bytes,

    /// The value.
    pub value: Bytes,
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            String::from_utf8_lossy(&self.key),
            String::from_utf8_lossy(&self.value)
        )
    }
}

impl KeyValue {
    /// Construct a new key-value pair from the given key and value.
    pub fn new(key: Bytes, value: Bytes) -> Self {
        Self { key, value }
    }

    /// Get the key of this key-value pair.
    ///
    /// This method is cheap, since [`Bytes`] are cheaply cloneable.
    #[inline]
    pub fn key(&self) -> Bytes {
        self.key.clone()
    }

    /// Get the value of this key-value pair.
    ///
    /// This method is cheap, since [`Bytes`] are cheaply cloneable.
    #[inline]
    pub fn value(&self) -> Bytes {
        self.value.clone()
    }

    /// Consumes the key-value pair and returns the key.
    #[inline]
    pub fn into_key(self) -> Bytes {
        self.key
    }

    /// Consumes the key-value pair and returns the value.
    #[inline]
    pub fn into_value(self) -> Bytes {
        self.value
    }
}

/// Every intermediate value emitted for one key, as delivered to a reduce
/// function. Value order is unspecified.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct KeyGroup {
    pub key: Bytes,
    pub values: Vec<Bytes>,
}

impl KeyGroup {
    pub fn new(key: Bytes, values: Vec<Bytes>) -> Self {
        Self { key, values }
    }

    /// Number of values in the group.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Hashes an intermediate key. Compute a reduce bucket for a given key
/// by calculating `ihash(key) % n_reduce`.
pub fn ihash(key: &[u8]) -> u32 {
    let mut hasher = fnv::FnvHasher::with_key(0);
    hasher.write(key);
    // Masked to 31 bits, so the conversion cannot truncate.
    (hasher.finish() & 0x7fffffff) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ihash_is_stable_and_bounded() {
        let a = ihash(b"fox");
        assert_eq!(a, ihash(b"fox"));
        assert!(a <= 0x7fffffff);
        assert_ne!(ihash(b"fox"), ihash(b"the"));
    }

    #[test]
    fn display_renders_key_then_value() {
        let kv = KeyValue::new(Bytes::from("fox"), Bytes::from("3"));
        assert_eq!(kv.to_string(), "fox 3");
    }

    #[test]
    fn key_group_reports_its_size() {
        let group = KeyGroup::new(Bytes::from("fox"), vec![Bytes::new(), Bytes::new()]);
        assert_eq!(group.len(), 2);
        assert!(!group.is_empty());
        assert!(KeyGroup::new(Bytes::from("x"), vec![]).is_empty());
    }
}
