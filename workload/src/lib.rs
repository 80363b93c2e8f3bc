//! MapReduce applications runnable by the standalone engine.

use common::Workload;

pub mod word_count;

/// Names accepted by [`try_named`].
pub const WORKLOADS: &[&str] = &["wc", "word-count"];

/// Looks up an application by name.
pub fn try_named(name: &str) -> Option<Workload> {
    match name {
        "wc" | "word-count" => Some(Workload {
            map_fn: word_count::map,
            reduce_fn: word_count::reduce,
        }),
        _ => None,
    }
}
