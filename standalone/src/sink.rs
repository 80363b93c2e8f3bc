//! Destinations for reduce results.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::debug;

use common::KeyValue;

/// Receives the results of each reduce partition once, after the
/// partition has been fully reduced.
pub trait OutputSink: Send {
    fn write_partition(&mut self, reduce_id: u32, results: &[KeyValue]) -> Result<()>;
}

/// Writes each partition to `{output}/mr-out-{reduce_id}` as `key\tvalue`
/// lines, in the order given (ascending by key).
pub struct DirectorySink {
    output_dir: PathBuf,
}

impl DirectorySink {
    /// Creates the output directory if it does not exist.
    ///
    /// An existing directory must be empty, so results of an earlier run
    /// can never be mixed with this one.
    pub fn create(output_dir: impl AsRef<Path>) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        if output_dir.exists() {
            let mut entries = fs::read_dir(&output_dir)
                .with_context(|| format!("failed to list output directory {}", output_dir.display()))?;
            if entries.next().is_some() {
                bail!("output directory {} already exists and is not empty", output_dir.display());
            }
        }
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;
        Ok(DirectorySink { output_dir })
    }

    pub fn partition_path(&self, reduce_id: u32) -> PathBuf {
        self.output_dir.join(format!("mr-out-{reduce_id}"))
    }
}

impl OutputSink for DirectorySink {
    fn write_partition(&mut self, reduce_id: u32, results: &[KeyValue]) -> Result<()> {
        let out_pathspec = self.partition_path(reduce_id);
        let file = File::create(&out_pathspec)
            .with_context(|| format!("failed to create {}", out_pathspec.display()))?;
        let mut out_file = BufWriter::new(file);

        for KeyValue { key, value } in results {
            out_file.write_all(key)?;
            out_file.write_all(b"\t")?;
            out_file.write_all(value)?;
            out_file.write_all(b"\n")?;
        }
        out_file.flush()?;

        debug!("wrote {} results to {}", results.len(), out_pathspec.display());
        Ok(())
    }
}

/// Keeps every partition in memory, keyed by reduce id.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub partitions: BTreeMap<u32, Vec<KeyValue>>,
}

impl OutputSink for MemorySink {
    fn write_partition(&mut self, reduce_id: u32, results: &[KeyValue]) -> Result<()> {
        self.partitions
            .entry(reduce_id)
            .or_default()
            .extend_from_slice(results);
        Ok(())
    }
}
