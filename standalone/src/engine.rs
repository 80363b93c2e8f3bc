use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use common::job::{JobReport, JobState, KeyFailure, RecordFailure};
use common::{KeyValue, MapReduceError, Workload};

use crate::input::read_records;
use crate::shuffle::{Grouping, HashGrouping, Partition};
use crate::sink::{DirectorySink, OutputSink};
use crate::Job;

/// Counters and failures from the map phase.
#[derive(Debug, Default)]
pub struct MapStats {
    pub records: u64,
    pub emissions: u64,
    pub failures: Vec<RecordFailure>,
}

/// Results and failures of one reduce partition.
#[derive(Debug, Default)]
pub struct PartitionOutput {
    pub reduce_id: u32,
    pub results: Vec<KeyValue>,
    pub failures: Vec<KeyFailure>,
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Runs the map function over a single record, returning everything it
/// emitted, or the first error.
fn map_record(record: KeyValue, workload: &Workload, aux: &Bytes) -> Result<Vec<KeyValue>> {
    let map_func = workload.map_fn;
    map_func(record, aux.clone())?.collect()
}

/// Maps every record in parallel and pushes the emissions into `grouping`.
///
/// A record is all-or-nothing: its emissions reach the grouping only if the
/// map function succeeded for the whole record. Failed records are skipped
/// and reported.
pub fn perform_map<G: Grouping>(
    records: Vec<KeyValue>,
    workload: &Workload,
    aux: &Bytes,
    grouping: &G,
) -> MapStats {
    let total = records.len() as u64;
    let emitted = AtomicU64::new(0);

    let failures = records
        .into_par_iter()
        .filter_map(|record| {
            let id = lossy(&record.key);
            match map_record(record, workload, aux) {
                Ok(emissions) => {
                    emitted.fetch_add(emissions.len() as u64, Ordering::Relaxed);
                    grouping.push(emissions);
                    None
                }
                Err(e) => {
                    warn!("skipping record {id}: {e:#}");
                    Some(RecordFailure {
                        record: id,
                        error: format!("{e:#}"),
                    })
                }
            }
        })
        .collect::<Vec<_>>();

    MapStats {
        records: total,
        emissions: emitted.into_inner(),
        failures,
    }
}

/// Checks that the grouping delivered every emission exactly once.
///
/// Every group must be non-empty, no key may appear in more than one group,
/// and the grouped values must add up to the number of emissions.
pub fn verify_partitions(partitions: &[Partition], emitted: u64) -> Result<(), MapReduceError> {
    let mut seen = HashSet::new();
    let mut grouped = 0u64;

    for partition in partitions {
        for group in &partition.groups {
            if group.is_empty() {
                return Err(MapReduceError::ContractViolation(format!(
                    "empty group for key `{}`",
                    lossy(&group.key)
                )));
            }
            if !seen.insert(group.key.clone()) {
                return Err(MapReduceError::ContractViolation(format!(
                    "key `{}` delivered in more than one group",
                    lossy(&group.key)
                )));
            }
            grouped += group.len() as u64;
        }
    }

    if grouped != emitted {
        return Err(MapReduceError::ContractViolation(format!(
            "{emitted} values emitted but {grouped} delivered"
        )));
    }
    Ok(())
}

fn is_fatal(e: &anyhow::Error) -> bool {
    e.downcast_ref::<MapReduceError>()
        .is_some_and(MapReduceError::is_fatal)
}

fn reduce_partition(partition: Partition, workload: &Workload, aux: &Bytes) -> Result<PartitionOutput> {
    let reduce_func = workload.reduce_fn;
    let mut output = PartitionOutput {
        reduce_id: partition.reduce_id,
        ..Default::default()
    };
    debug!(
        "reducing partition {}: {} keys, {} values",
        partition.reduce_id,
        partition.groups.len(),
        partition.value_count()
    );

    for group in partition.groups {
        let key = group.key;
        match reduce_func(key.clone(), Box::new(group.values.into_iter()), aux.clone()) {
            Ok(value) => output.results.push(KeyValue { key, value }),
            Err(e) if is_fatal(&e) => {
                error!("reduce of key `{}` reported a broken group: {e:#}", lossy(&key));
                return Err(e);
            }
            Err(e) => {
                let key = lossy(&key);
                warn!("reduce failed for key `{key}`: {e:#}");
                output.failures.push(KeyFailure {
                    key,
                    error: format!("{e:#}"),
                });
            }
        }
    }

    debug!(
        "partition {} reduced: {} results, {} failures",
        output.reduce_id,
        output.results.len(),
        output.failures.len()
    );
    Ok(output)
}

/// Reduces every partition in parallel. Each key group is passed to the
/// reduce function exactly once; a failing key does not affect the others.
///
/// A reduce function reporting a [`MapReduceError::ContractViolation`]
/// fails the whole phase.
pub fn perform_reduce(partitions: Vec<Partition>, workload: &Workload, aux: &Bytes) -> Result<Vec<PartitionOutput>> {
    let mut outputs = partitions
        .into_par_iter()
        .map(|partition| reduce_partition(partition, workload, aux))
        .collect::<Result<Vec<_>>>()?;
    outputs.sort_unstable_by_key(|o| o.reduce_id);
    Ok(outputs)
}

/// Runs the full pipeline over in-memory records.
///
/// Record and key failures are collected into the report. A grouping that
/// breaks its contract fails the whole run, and nothing is written to `sink`.
/// The same holds when a reduce function reports a contract violation.
pub fn run<G, S>(
    records: Vec<KeyValue>,
    workload: &Workload,
    aux: &Bytes,
    grouping: G,
    sink: &mut S,
) -> Result<JobReport>
where
    G: Grouping,
    S: OutputSink + ?Sized,
{
    info!("job state: {}, {} records", JobState::Mapping, records.len());
    let stats = perform_map(records, workload, aux, &grouping);

    info!("job state: {}, {} emissions", JobState::Shuffling, stats.emissions);
    let partitions = grouping.into_partitions();
    if let Err(e) = verify_partitions(&partitions, stats.emissions) {
        error!("aborting job: {e}");
        return Err(e.into());
    }
    let keys = partitions.iter().map(|p| p.groups.len() as u64).sum::<u64>();

    info!("job state: {}, {} keys in {} partitions", JobState::Reducing, keys, partitions.len());
    let outputs = perform_reduce(partitions, workload, aux)?;

    let mut report = JobReport {
        records: stats.records,
        emissions: stats.emissions,
        keys,
        failed_records: stats.failures,
        ..Default::default()
    };
    for output in outputs {
        sink.write_partition(output.reduce_id, &output.results)?;
        report.results.extend(output.results);
        report.failed_keys.extend(output.failures);
    }
    report.results.sort_unstable_by_key(KeyValue::key);

    info!(
        "job state: {}, {} results, {} failed records, {} failed keys",
        JobState::Completed,
        report.results.len(),
        report.failed_records.len(),
        report.failed_keys.len()
    );
    Ok(report)
}

/// Runs `job` end to end, reading its input files and writing one output
/// file per reduce partition into the output directory.
pub fn run_job(job: &Job) -> Result<JobReport> {
    let workload = workload::try_named(&job.workload)
        .ok_or_else(|| {
            anyhow!(
                "The workload `{}` is not a known workload (known: {})",
                job.workload,
                workload::WORKLOADS.join(", ")
            )
        })?;
    let aux = Bytes::from(serde_json::to_string(&job.args)?);

    info!("job state: {}, input `{}`", JobState::Pending, job.input);
    let records = read_records(&job.input)?;
    let mut sink = DirectorySink::create(&job.output)?;

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = job.threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder.build().context("failed to build worker pool")?;

    let grouping = HashGrouping::new(job.reducers);
    info!(
        "{} records, {} reduce partitions, {} threads",
        records.len(),
        grouping.n_reduce(),
        pool.current_num_threads()
    );

    pool.install(|| run(records, &workload, &aux, grouping, &mut sink))
}
